//! Prometheus-based monitoring.
//!
//! Tracks job outcomes and durations, record throughput, admission
//! rejections and persistence results.
//!
//! # Example
//!
//! ```ignore
//! use recordforge::metrics::{export_metrics, init_metrics};
//!
//! init_metrics()?;
//! // ... run jobs ...
//! println!("{}", export_metrics());
//! ```

pub mod collectors;
pub mod prometheus;

pub use collectors::MetricsCollector;
pub use prometheus::{export_metrics, init_metrics};

pub use prometheus::{
    ACTIVE_JOBS, ADMISSION_REJECTIONS, JOBS_TOTAL, JOB_DURATION, PERSISTENCE_TOTAL,
    RECORDS_GENERATED, RECORDS_IN_FLIGHT, RECORDS_SKIPPED, REGISTRY,
};
