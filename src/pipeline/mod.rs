//! Job pipeline execution.
//!
//! A job moves records through four kinds of stage:
//!
//! - **Source**: synthesizes one record per sequence number from a
//!   [`crate::model::Specification`]
//! - **Filters**: optionally perturb each record, in configured order
//! - **Sinks**: render records into artifacts
//! - **Persistence**: durably store every artifact once all sinks finish
//!
//! [`Job`] drives these stages through its state machine:
//!
//! ```text
//! Uninitialized -> Pending -> Executing -> Persisting -> Success
//!                                      \-> Canceled
//!                                      \-> Failed
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use recordforge::pipeline::{Job, JobConfig, StageContext};
//!
//! let context = StageContext::builtin()?;
//! let mut job = Job::new(JobConfig::new("CensusData", 50).with_seed(7));
//! job.configure(&context)?;
//!
//! let status = job.run()?;
//! println!("{} finished as {}", job.id(), status);
//! ```
//!
//! Jobs are normally queued on a [`crate::registry::JobManager`], which
//! runs each one on its own worker thread.

pub mod config;
pub mod context;
pub mod filter;
pub mod job;
pub mod source;
pub mod stage;
pub mod status;

pub use config::{BackendConfig, FilterKind, JobConfig, OutputFormat};
pub use context::StageContext;
pub use filter::Corruptor;
pub use job::{CompletionCallback, Job, JobHandle, StageSet};
pub use source::GeneratorSource;
pub use stage::{
    FilterStage, PersistenceStage, PersistenceStatus, SinkStage, SourceStage, StatusCell,
};
pub use status::JobStatus;
