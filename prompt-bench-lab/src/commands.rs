pub mod analyze;
pub mod compare;
pub mod consensus;
pub mod evaluate;
pub mod recommend;
