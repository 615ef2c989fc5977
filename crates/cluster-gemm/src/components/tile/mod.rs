mod kernel;
mod layout;
mod partition;

pub use kernel::*;
pub use layout::*;
pub use partition::*;
