pub mod ids;
pub mod candidate;
pub mod ranking;
pub mod evaluation;
pub mod batch;
pub mod weights;
pub mod recommendation;

pub use ids::*;
pub use candidate::*;
pub use ranking::*;
pub use evaluation::*;
pub use batch::*;
pub use weights::*;
pub use recommendation::*;
