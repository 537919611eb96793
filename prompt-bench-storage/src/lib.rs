pub mod memory;
pub mod repositories;
pub mod snapshot;

pub use memory::*;
pub use snapshot::*;
