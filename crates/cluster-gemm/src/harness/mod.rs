mod fill;
mod reference;
mod runner;

pub use fill::*;
pub use reference::*;
pub use runner::*;
