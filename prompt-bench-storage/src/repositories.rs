pub mod batch;
pub mod candidate;
pub mod evaluation;
pub mod ranking;
pub mod template;
pub mod weights;
