//! Job registry.
//!
//! This module provides functionality for:
//! - Admitting jobs under configurable resource limits
//! - Running each admitted job on its own worker
//! - Authorizing cancellation with a per-job queue token
//! - Answering status, progress and result queries concurrently
//! - Expiring completed jobs in the background

pub mod admission;
pub mod completion;
pub mod manager;
pub mod sweep;

pub use admission::{AdmissionRequest, LimitViolation, Load};
pub use completion::CompletionSignal;
pub use manager::{
    JobManager, JobSummary, LifetimeStats, ManagerInfo, QueueToken, SyncOutcome,
};
pub use sweep::ExpirySweep;
