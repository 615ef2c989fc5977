//! Software-pipelined, tile-based GEMM for clusters of compute cores.
//!
//! Computes `C = alpha * op(A) * op(B) + beta * C` on a simulated [System](cluster_runtime::System).
//! Every cluster streams tiles of the operands from shared memory into double-buffered slots of
//! its local memory, while its compute cores work on the previous tile and the tile before that
//! is written back. Work is spread over clusters either by output rows or by slices of the
//! reduction dimension followed by a reduction tree.

#[macro_use]
extern crate derive_new;

/// Building blocks of the engine.
pub mod components;
/// Self-checking harness comparing the engine against a reference GEMM.
pub mod harness;

mod base;

pub use base::*;
