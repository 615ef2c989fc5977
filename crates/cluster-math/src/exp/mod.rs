mod context;
mod naive;
mod pipelined;

pub use context::*;
pub use naive::*;
pub use pipelined::*;
