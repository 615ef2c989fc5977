#![warn(missing_docs)]

//! Simulated execution substrate for tightly-coupled compute clusters.
//!
//! A [System] models one or more clusters. Each cluster owns a small fast local memory
//! ([Tcdm](memory::Tcdm)), one transfer engine ([DmaEngine](transfer::DmaEngine)) and a set of
//! cores: several compute cores plus one data-movement core that issues transfers. All clusters
//! share one large [SharedMemory](memory::SharedMemory) and are only connected to each other
//! through explicit transfers.
//!
//! Kernels are launched with [System::launch], which runs one thread per simulated core.

#[macro_use]
extern crate derive_new;

/// Global configuration and logging.
pub mod config;
/// Shared and local memories.
pub mod memory;
/// Barriers and wake flags.
pub mod sync;
/// Transfer engines.
pub mod transfer;

mod error;
mod system;
mod timer;

pub use error::*;
pub use system::*;
pub use timer::*;
