pub mod cache;
pub mod evaluate;
