use cluster_runtime::MemoryError;
use thiserror::Error;

/// Errors that can occur during the setup phase of a GEMM.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GemmSetupError {
    /// The problem or its combination with the topology is rejected.
    #[error("Unable to launch GEMM because the config is invalid: {0}")]
    InvalidConfig(String),

    /// The tile buffers don't fit in a cluster's local memory.
    #[error(
        "Unable to launch GEMM because the tile buffers need {required} bytes of local memory but only {available} are available"
    )]
    LocalMemoryExhausted {
        /// Bytes needed by the descriptor and all tile slots.
        required: usize,
        /// Size of the local memory.
        available: usize,
    },

    /// The operands or the descriptor can't be placed in shared memory.
    #[error("Unable to launch GEMM because shared memory is exhausted: {0}")]
    SharedMemoryExhausted(#[from] MemoryError),

    /// The system lacks something the problem needs.
    #[error("Unable to launch GEMM because a required feature is unavailable: {0}")]
    Unavailable(String),
}

impl GemmSetupError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
