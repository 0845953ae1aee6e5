// src/config/mod.rs
pub mod stream;

pub use stream::StreamConfig;
