use std::sync::{Arc, mpsc};
use std::thread;

use super::request::{Transfer, TransferRequest};
use crate::config::Logger;
use crate::memory::MemoryMap;

/// Handle to the thread executing the transfers of one cluster.
#[derive(Debug)]
pub(crate) struct Worker {
    tx: Option<mpsc::Sender<TransferRequest>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    pub fn new(
        cluster_idx: usize,
        memory: Arc<MemoryMap>,
        logger: Option<Arc<spin::Mutex<Logger>>>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        let inner_worker = InnerWorker {
            cluster_idx,
            memory,
            logger,
            rx,
        };
        let handle = thread::Builder::new()
            .name(format!("dma-{cluster_idx}"))
            .spawn(move || inner_worker.work())
            .expect("Should be able to spawn the transfer engine thread");

        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Queues a request, returning false if the worker is gone.
    pub fn send(&self, request: TransferRequest) -> bool {
        match &self.tx {
            Some(tx) => tx.send(request).is_ok(),
            None => false,
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.tx = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct InnerWorker {
    cluster_idx: usize,
    memory: Arc<MemoryMap>,
    logger: Option<Arc<spin::Mutex<Logger>>>,
    rx: mpsc::Receiver<TransferRequest>,
}

impl InnerWorker {
    fn work(self) {
        log::trace!("Transfer engine of cluster {} started", self.cluster_idx);
        for request in self.rx.iter() {
            match request {
                TransferRequest::Copy(transfer) => self.execute(&transfer),
                TransferRequest::Fence(callback) => {
                    // The issuer may have given up waiting.
                    let _ = callback.send(());
                }
            }
        }
        log::trace!("Transfer engine of cluster {} stopped", self.cluster_idx);
    }

    fn execute(&self, transfer: &Transfer) {
        log::trace!("Cluster {} transfer {transfer}", self.cluster_idx);
        if let Some(logger) = &self.logger {
            logger
                .lock()
                .log_transfer(&format_args!("[cluster {}] {transfer}", self.cluster_idx));
        }

        for row in 0..transfer.repeat {
            // Rows are staged through a buffer, so source and destination may share a memory.
            let bytes = self
                .memory
                .read_bytes(transfer.src.offset(row * transfer.src_stride), transfer.size);
            self.memory
                .write_bytes(transfer.dst.offset(row * transfer.dst_stride), &bytes);
        }
    }
}
