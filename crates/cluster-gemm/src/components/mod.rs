/// Pipelines and the work each cluster does in them.
pub mod global;
/// Local tile buffers.
pub mod stage;
/// Micro-kernels and the row partition of one tile.
pub mod tile;

mod args;
mod error;
mod problem;
mod selection;

pub use args::*;
pub use error::*;
pub use problem::*;
pub(crate) use selection::execute;
