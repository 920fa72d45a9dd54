pub mod config;
pub mod digest;
pub mod platform;
pub mod scheduler;
