//! Vector math kernels written the way the cluster compute cores run them: batches of elements
//! flowing through phases that are software-pipelined against each other.

/// Single-precision exponential.
pub mod exp;

mod error;

pub use error::*;
