pub mod clock;
pub mod config;
pub mod models;
pub mod storage;
pub mod sync;
