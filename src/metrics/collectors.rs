//! High-level metric recording for jobs and the manager.
//!
//! `MetricsCollector` wraps the raw Prometheus metrics so call sites only
//! name domain events. Each method is a no-op until
//! [`init_metrics`](super::init_metrics) has run.

use super::prometheus::{
    ACTIVE_JOBS, ADMISSION_REJECTIONS, JOBS_TOTAL, JOB_DURATION, PERSISTENCE_TOTAL,
    RECORDS_GENERATED, RECORDS_IN_FLIGHT, RECORDS_SKIPPED,
};
use crate::model::BackendKind;
use crate::pipeline::JobStatus;

/// Records recordforge operational metrics.
///
/// # Example
///
/// ```ignore
/// use recordforge::metrics::{init_metrics, MetricsCollector};
/// use recordforge::pipeline::JobStatus;
///
/// init_metrics()?;
/// let collector = MetricsCollector::new();
/// collector.record_job(JobStatus::Success, "CensusData", 1.25);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    /// Record a job reaching a terminal state.
    pub fn record_job(&self, status: JobStatus, specification: &str, duration_secs: f64) {
        if let Some(jobs_total) = JOBS_TOTAL.get() {
            jobs_total
                .with_label_values(&[status.as_str(), specification])
                .inc();
        }

        if let Some(job_duration) = JOB_DURATION.get() {
            job_duration
                .with_label_values(&[specification])
                .observe(duration_secs);
        }

        tracing::trace!(
            status = %status,
            specification = specification,
            duration_secs = duration_secs,
            "Recorded job metric"
        );
    }

    /// Record records handed to sinks.
    pub fn record_generated(&self, specification: &str, records: u64) {
        if let Some(generated) = RECORDS_GENERATED.get() {
            generated
                .with_label_values(&[specification])
                .inc_by(records as f64);
        }
    }

    pub fn record_skipped(&self) {
        if let Some(skipped) = RECORDS_SKIPPED.get() {
            skipped.inc();
        }
    }

    /// Update the active job and outstanding record gauges.
    pub fn update_load(&self, active_jobs: usize, records_in_flight: u64) {
        if let Some(active) = ACTIVE_JOBS.get() {
            active.set(active_jobs as f64);
        }

        if let Some(in_flight) = RECORDS_IN_FLIGHT.get() {
            in_flight.set(records_in_flight as f64);
        }

        tracing::trace!(
            active_jobs = active_jobs,
            records_in_flight = records_in_flight,
            "Updated load metrics"
        );
    }

    /// Record an admission rejection for the given limit.
    pub fn record_rejection(&self, reason: &str) {
        if let Some(rejections) = ADMISSION_REJECTIONS.get() {
            rejections.with_label_values(&[reason]).inc();
        }
    }

    pub fn record_persistence(&self, backend: BackendKind, success: bool) {
        let status = if success { "success" } else { "failure" };

        if let Some(persistence) = PERSISTENCE_TOTAL.get() {
            persistence
                .with_label_values(&[backend.name(), status])
                .inc();
        }

        tracing::trace!(backend = %backend, status = status, "Recorded persistence metric");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{export_metrics, init_metrics};

    #[test]
    fn test_recording_before_init_does_not_panic() {
        let collector = MetricsCollector::new();
        collector.record_skipped();
        collector.update_load(0, 0);
    }

    #[test]
    fn test_recorded_labels_are_exported() {
        init_metrics().expect("init should succeed");
        let collector = MetricsCollector::new();

        collector.record_job(JobStatus::Canceled, "Names", 0.5);
        collector.record_generated("Names", 12);
        collector.record_rejection("queued_jobs");
        collector.record_persistence(BackendKind::Archive, false);

        let metrics = export_metrics();
        assert!(metrics.contains("status=\"canceled\""));
        assert!(metrics.contains("reason=\"queued_jobs\""));
        assert!(metrics.contains("backend=\"archive\""));
    }
}
