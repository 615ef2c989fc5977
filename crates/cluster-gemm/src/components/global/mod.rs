mod geometry;
mod pipeline;
mod reduction;
mod tile_gemm;

pub use pipeline::*;
pub use reduction::*;
pub use tile_gemm::*;
