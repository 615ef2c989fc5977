use thiserror::Error;

/// Errors raised by the memory allocators of the simulated system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The shared memory has no room left for the requested allocation.
    #[error("Out of shared memory: requested {requested} bytes but only {available} are left")]
    OutOfMemory {
        /// Requested size in bytes.
        requested: usize,
        /// Remaining capacity in bytes.
        available: usize,
    },
}
