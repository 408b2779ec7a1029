//! Prometheus metrics registration and export.
//!
//! Every recordforge metric lives in one process-wide registry, created by
//! [`init_metrics`]. Until then recording is a no-op.

use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all recordforge metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Jobs reaching a terminal state, labeled by status and specification.
pub static JOBS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Time from execute to terminal state in seconds, labeled by specification.
pub static JOB_DURATION: OnceLock<HistogramVec> = OnceLock::new();

/// Records handed to sinks, labeled by specification.
pub static RECORDS_GENERATED: OnceLock<CounterVec> = OnceLock::new();

/// Sequence numbers skipped after a generation failure.
pub static RECORDS_SKIPPED: OnceLock<IntCounter> = OnceLock::new();

/// Records still to be produced across all active jobs.
pub static RECORDS_IN_FLIGHT: OnceLock<Gauge> = OnceLock::new();

/// Number of admitted, non-terminal jobs.
pub static ACTIVE_JOBS: OnceLock<Gauge> = OnceLock::new();

/// Rejected admissions, labeled by the violated limit.
pub static ADMISSION_REJECTIONS: OnceLock<IntCounterVec> = OnceLock::new();

/// Persistence results, labeled by backend and outcome.
pub static PERSISTENCE_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Safe to call more than once; later calls leave the first registry in
/// place.
///
/// # Errors
///
/// Returns a `prometheus::Error` if metric construction or registration fails.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    // Job metrics
    let jobs_total = IntCounterVec::new(
        Opts::new("recordforge_jobs_total", "Jobs reaching a terminal state"),
        &["status", "specification"],
    )?;

    let job_duration = HistogramVec::new(
        HistogramOpts::new(
            "recordforge_job_duration_seconds",
            "Job execution duration in seconds",
        )
        .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0]),
        &["specification"],
    )?;

    let active_jobs = Gauge::new("recordforge_active_jobs", "Admitted non-terminal jobs")?;

    // Record metrics
    let records_generated = CounterVec::new(
        Opts::new("recordforge_records_generated_total", "Records handed to sinks"),
        &["specification"],
    )?;

    let records_skipped = IntCounter::new(
        "recordforge_records_skipped_total",
        "Sequence numbers skipped after a generation failure",
    )?;

    let records_in_flight = Gauge::new(
        "recordforge_records_in_flight",
        "Records still to be produced across active jobs",
    )?;

    // Admission and persistence
    let admission_rejections = IntCounterVec::new(
        Opts::new(
            "recordforge_admission_rejections_total",
            "Jobs rejected by admission control",
        ),
        &["reason"],
    )?;

    let persistence_total = IntCounterVec::new(
        Opts::new("recordforge_persistence_total", "Persistence results"),
        &["backend", "status"],
    )?;

    registry.register(Box::new(jobs_total.clone()))?;
    registry.register(Box::new(job_duration.clone()))?;
    registry.register(Box::new(active_jobs.clone()))?;
    registry.register(Box::new(records_generated.clone()))?;
    registry.register(Box::new(records_skipped.clone()))?;
    registry.register(Box::new(records_in_flight.clone()))?;
    registry.register(Box::new(admission_rejections.clone()))?;
    registry.register(Box::new(persistence_total.clone()))?;

    // A concurrent initializer may have won; its metrics stay authoritative.
    let _ = REGISTRY.set(registry);
    let _ = JOBS_TOTAL.set(jobs_total);
    let _ = JOB_DURATION.set(job_duration);
    let _ = ACTIVE_JOBS.set(active_jobs);
    let _ = RECORDS_GENERATED.set(records_generated);
    let _ = RECORDS_SKIPPED.set(records_skipped);
    let _ = RECORDS_IN_FLIGHT.set(records_in_flight);
    let _ = ADMISSION_REJECTIONS.set(admission_rejections);
    let _ = PERSISTENCE_TOTAL.set(persistence_total);

    tracing::info!("Prometheus metrics initialized successfully");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_idempotent() {
        init_metrics().expect("first init should succeed");
        init_metrics().expect("second init should succeed");
        assert!(REGISTRY.get().is_some());
    }

    #[test]
    fn test_export_after_init() {
        init_metrics().expect("init should succeed");
        if let Some(skipped) = RECORDS_SKIPPED.get() {
            skipped.inc();
        }

        let metrics = export_metrics();
        assert!(!metrics.starts_with("# Error"));
        assert!(metrics.contains("recordforge_records_skipped_total"));
    }
}
