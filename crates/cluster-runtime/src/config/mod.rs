/// Profiling config module.
pub mod profiling;
/// Topology config module.
pub mod topology;
/// Transfer config module.
pub mod transfer;

mod base;
mod logger;

pub use base::*;
pub use logger::*;
pub use topology::Topology;
