#![warn(missing_docs)]

//! Common element types and utilities for the cluster GEMM crates.

/// Minifloat types.
pub mod float;

/// Precision tags and the element types they map to.
pub mod precision;

/// Seeded random number helpers.
pub mod rand;

pub use float::e5m2;
pub use precision::*;
