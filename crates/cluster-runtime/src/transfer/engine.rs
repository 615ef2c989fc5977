use std::sync::{Arc, mpsc};

use super::request::{Transfer, TransferRequest};
use super::worker::Worker;
use crate::config::Logger;
use crate::memory::{Addr, MemoryMap};

/// The transfer engine of one cluster.
///
/// Transfers are fire-and-forget: `start_*` queue a copy and return immediately. Copies execute
/// in issue order on a dedicated thread; [DmaEngine::wait_all] blocks until everything issued so
/// far has landed.
#[derive(Debug)]
pub struct DmaEngine {
    cluster_idx: usize,
    worker: Worker,
}

impl DmaEngine {
    pub(crate) fn new(
        cluster_idx: usize,
        memory: Arc<MemoryMap>,
        logger: Option<Arc<spin::Mutex<Logger>>>,
    ) -> Self {
        Self {
            cluster_idx,
            worker: Worker::new(cluster_idx, memory, logger),
        }
    }

    /// Cluster owning the engine.
    pub fn cluster_idx(&self) -> usize {
        self.cluster_idx
    }

    /// Starts a contiguous copy of `size` bytes.
    pub fn start_1d(&self, dst: impl Into<Addr>, src: impl Into<Addr>, size: usize) {
        self.start(Transfer::contiguous(dst.into(), src.into(), size));
    }

    /// Starts a strided copy of `repeat` rows of `size` bytes.
    pub fn start_2d(
        &self,
        dst: impl Into<Addr>,
        src: impl Into<Addr>,
        size: usize,
        dst_stride: usize,
        src_stride: usize,
        repeat: usize,
    ) {
        self.start(Transfer::new(
            dst.into(),
            src.into(),
            size,
            dst_stride,
            src_stride,
            repeat,
        ));
    }

    /// Starts an arbitrary transfer.
    pub fn start(&self, transfer: Transfer) {
        if transfer.bytes() == 0 {
            return;
        }
        if !self.worker.send(TransferRequest::Copy(transfer)) {
            self.fault();
        }
    }

    /// Blocks until every transfer issued so far has completed.
    pub fn wait_all(&self) {
        let (callback, done) = mpsc::channel();
        if !self.worker.send(TransferRequest::Fence(callback)) || done.recv().is_err() {
            self.fault();
        }
    }

    fn fault(&self) -> ! {
        panic!(
            "Transfer engine of cluster {} faulted while executing a transfer",
            self.cluster_idx
        )
    }
}
