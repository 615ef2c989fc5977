mod engine;
mod mcast;
mod request;
mod tile;
mod worker;

pub use engine::*;
pub use mcast::*;
pub use request::Transfer;
pub use tile::*;
