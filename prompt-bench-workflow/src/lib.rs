pub mod judge;
pub mod orchestrator;
pub mod service;
pub mod template;

pub use judge::*;
pub use orchestrator::*;
pub use service::*;
pub use template::*;
