//! recordforge: synthetic structured record generator.
//!
//! This library queues generation jobs, runs each one through a pipeline of
//! source, filter, sink and persistence stages, and tracks them until they
//! complete or expire.

// Core modules
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod generator;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod storage;
pub mod utils;

// Re-export commonly used error types
pub use config::ConfigError;
pub use error::{
    ConfigurationError, GenerationError, JobError, QueueError, RegistryError, StageError,
};
