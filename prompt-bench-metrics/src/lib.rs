pub mod aggregators;
pub mod agreement;
pub mod comparison;
pub mod consensus;
pub mod quality;
pub mod recommendation;

pub use aggregators::*;
pub use agreement::*;
pub use comparison::*;
pub use consensus::*;
pub use quality::*;
pub use recommendation::*;
