use core::cell::RefCell;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::config::{BinaryLogLevel, GlobalConfig, Logger, Topology, profiling::ProfilingLogLevel};
use crate::memory::{LocalAddr, MemoryMap, SharedMemory, Tcdm};
use crate::sync::{Barrier, LaunchAborted, WakeFlag};
use crate::transfer::DmaEngine;
use crate::{StageReport, StageTimer};

/// A simulated machine: clusters of cores around a shared memory.
#[derive(Debug)]
pub struct System {
    topology: Topology,
    memory: Arc<MemoryMap>,
    engines: Vec<DmaEngine>,
    cluster_barriers: Vec<Barrier>,
    global_barrier: Barrier,
    wake_flags: Vec<WakeFlag>,
    logger: Arc<spin::Mutex<Logger>>,
}

impl System {
    /// Builds the memories, transfer engines and synchronisation primitives of `topology`.
    pub fn new(topology: Topology) -> Self {
        let memory = Arc::new(MemoryMap::new(&topology));
        let logger = Arc::new(spin::Mutex::new(Logger::new()));
        let transfer_logger = match logger.lock().log_level_transfer() {
            BinaryLogLevel::Full => Some(logger.clone()),
            BinaryLogLevel::Disabled => None,
        };

        let engines = (0..topology.clusters)
            .map(|cluster| DmaEngine::new(cluster, memory.clone(), transfer_logger.clone()))
            .collect();
        let cluster_barriers = (0..topology.clusters)
            .map(|_| Barrier::new(topology.cores_per_cluster()))
            .collect();
        let wake_flags = (0..topology.total_cores())
            .map(|_| WakeFlag::default())
            .collect();

        log::debug!(
            "System with {} clusters of {} compute cores",
            topology.clusters,
            topology.compute_cores
        );

        Self {
            global_barrier: Barrier::new(topology.total_cores()),
            topology,
            memory,
            engines,
            cluster_barriers,
            wake_flags,
            logger,
        }
    }

    /// Builds the system described by the topology of the [GlobalConfig].
    pub fn from_config() -> Self {
        Self::new(GlobalConfig::get().topology.clone())
    }

    /// Shape of the system.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Every memory of the system.
    pub fn memory(&self) -> &MemoryMap {
        &self.memory
    }

    /// The memory shared by all clusters.
    pub fn shared(&self) -> &SharedMemory {
        self.memory.shared()
    }

    /// Runs `kernel` on every core of every cluster, one thread per core, and returns the status
    /// of each core in (cluster, core) order.
    ///
    /// # Panics
    ///
    /// If a core panics. Cores blocked in a barrier or on a wake flag are released and the first
    /// fault is resumed on the caller.
    pub fn launch<F>(&self, kernel: F) -> Vec<i32>
    where
        F: Fn(&CoreContext<'_>) -> i32 + Sync,
    {
        self.reset_sync();

        let origin = Instant::now();
        let profiling = self.logger.lock().log_level_profiling();
        let enabled = profiling != ProfilingLogLevel::Disabled;
        let kernel = &kernel;

        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..self.topology.clusters)
                .flat_map(|cluster_idx| {
                    (0..self.topology.cores_per_cluster()).map(move |core_idx| (cluster_idx, core_idx))
                })
                .map(|(cluster_idx, core_idx)| {
                    thread::Builder::new()
                        .name(format!("cluster-{cluster_idx}-core-{core_idx}"))
                        .spawn_scoped(scope, move || {
                            let core = CoreContext {
                                system: self,
                                cluster_idx,
                                core_idx,
                                timer: RefCell::new(StageTimer::new(origin, enabled)),
                            };
                            match panic::catch_unwind(AssertUnwindSafe(|| kernel(&core))) {
                                Ok(status) => Ok((status, core.timer.into_inner())),
                                Err(payload) => {
                                    self.abort();
                                    Err((cluster_idx, core_idx, payload))
                                }
                            }
                        })
                        .expect("Should be able to spawn a core thread")
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(payload) => panic::resume_unwind(payload),
                })
                .collect()
        });

        let mut statuses = Vec::with_capacity(results.len());
        let mut timers = Vec::with_capacity(results.len());
        let mut fault: Option<Box<dyn Any + Send>> = None;

        for result in results {
            match result {
                Ok((status, timer)) => {
                    statuses.push(status);
                    timers.push(timer);
                }
                Err((cluster_idx, core_idx, payload)) => {
                    if payload.downcast_ref::<LaunchAborted>().is_none() && fault.is_none() {
                        log::error!("Core {core_idx} of cluster {cluster_idx} faulted");
                        fault = Some(payload);
                    }
                }
            }
        }

        if let Some(payload) = fault {
            panic::resume_unwind(payload);
        }

        self.report(profiling, &timers);
        statuses
    }

    fn report(&self, level: ProfilingLogLevel, timers: &[StageTimer]) {
        if level == ProfilingLogLevel::Disabled {
            return;
        }

        let cores = self.topology.cores_per_cluster();
        let mut logger = self.logger.lock();

        for (index, timer) in timers.iter().enumerate() {
            let (cluster_idx, core_idx) = (index / cores, index % cores);

            if level == ProfilingLogLevel::Full {
                for span in timer.spans() {
                    logger.log_profiling(&format_args!(
                        "[cluster {cluster_idx} core {core_idx}] {} {:?}..{:?}",
                        span.label, span.start, span.end
                    ));
                }
            }

            logger.log_profiling(&StageReport {
                cluster_idx,
                core_idx,
                timer,
            });
        }
    }

    fn abort(&self) {
        self.global_barrier.abort();
        self.cluster_barriers.iter().for_each(Barrier::abort);
        self.wake_flags.iter().for_each(WakeFlag::abort);
    }

    fn reset_sync(&self) {
        self.global_barrier.reset();
        self.cluster_barriers.iter().for_each(Barrier::reset);
        self.wake_flags.iter().for_each(WakeFlag::reset);
    }
}

/// The view one simulated core has of the system while running a kernel.
#[derive(Debug)]
pub struct CoreContext<'a> {
    system: &'a System,
    cluster_idx: usize,
    core_idx: usize,
    timer: RefCell<StageTimer>,
}

impl<'a> CoreContext<'a> {
    /// Index of the core's cluster.
    pub fn cluster_idx(&self) -> usize {
        self.cluster_idx
    }

    /// Index of the core inside its cluster. Compute cores come first, the data-movement core
    /// is last.
    pub fn core_idx(&self) -> usize {
        self.core_idx
    }

    /// Whether this core issues the transfers of its cluster.
    pub fn is_dm_core(&self) -> bool {
        self.core_idx == self.system.topology.dm_core_idx()
    }

    /// Whether this core takes part in computation.
    pub fn is_compute_core(&self) -> bool {
        !self.is_dm_core()
    }

    /// Number of compute cores per cluster.
    pub fn compute_core_num(&self) -> usize {
        self.system.topology.compute_cores
    }

    /// Number of clusters.
    pub fn cluster_num(&self) -> usize {
        self.system.topology.clusters
    }

    /// Shape of the system.
    pub fn topology(&self) -> &'a Topology {
        &self.system.topology
    }

    /// The local memory of this core's cluster.
    pub fn tcdm(&self) -> &'a Tcdm {
        self.system.memory.tcdm(self.cluster_idx)
    }

    /// Address `offset` bytes into this core's TCDM.
    pub fn local_addr(&self, offset: usize) -> LocalAddr {
        LocalAddr::new(self.cluster_idx, offset)
    }

    /// The memory shared by all clusters.
    pub fn shared(&self) -> &'a SharedMemory {
        self.system.memory.shared()
    }

    /// The transfer engine of this core's cluster.
    pub fn dma(&self) -> &'a DmaEngine {
        &self.system.engines[self.cluster_idx]
    }

    /// Blocks until every core of this cluster has arrived.
    pub fn cluster_barrier(&self) {
        self.system.cluster_barriers[self.cluster_idx].wait();
    }

    /// Blocks until every core of every cluster has arrived.
    pub fn global_barrier(&self) {
        self.system.global_barrier.wait();
    }

    /// Wake flag of any core of the system.
    pub fn wake_flag(&self, cluster_idx: usize, core_idx: usize) -> &'a WakeFlag {
        &self.system.wake_flags[cluster_idx * self.system.topology.cores_per_cluster() + core_idx]
    }

    /// Times the region until the returned guard is dropped.
    pub fn span(&self, label: &'static str) -> SpanGuard<'_> {
        SpanGuard {
            timer: &self.timer,
            label,
            start: Instant::now(),
        }
    }
}

/// Records a span on the core's timer when dropped.
#[derive(Debug)]
pub struct SpanGuard<'a> {
    timer: &'a RefCell<StageTimer>,
    label: &'static str,
    start: Instant,
}

impl Drop for SpanGuard<'_> {
    fn drop(&mut self) {
        self.timer.borrow_mut().record(self.label, self.start);
    }
}
