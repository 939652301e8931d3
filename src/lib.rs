pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod jobs;
pub mod sources;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::Error;
pub use types::*;
