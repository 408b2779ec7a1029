//! Admission control.
//!
//! Every limit is evaluated against the aggregate load observed at the
//! moment a job is about to be admitted, and all violations are reported
//! together.

use std::fmt;
use std::time::Duration;

use crate::config::LimitsConfig;

/// A limit a job would break if admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitViolation {
    RecordsPerJob { requested: u64, limit: u64 },
    SyncRecordsPerJob { requested: u64, limit: u64 },
    QueuedJobs { limit: usize },
    RecordsInFlight { requested: u64, in_flight: u64, limit: u64 },
    RateLimited { caller: String, retry_after: Duration },
}

impl LimitViolation {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            LimitViolation::RecordsPerJob { .. } => "records_per_job",
            LimitViolation::SyncRecordsPerJob { .. } => "sync_records_per_job",
            LimitViolation::QueuedJobs { .. } => "queued_jobs",
            LimitViolation::RecordsInFlight { .. } => "records_in_flight",
            LimitViolation::RateLimited { .. } => "rate_limited",
        }
    }
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitViolation::RecordsPerJob { requested, limit } => write!(
                f,
                "record count {} exceeds the per-job limit of {}",
                requested, limit
            ),
            LimitViolation::SyncRecordsPerJob { requested, limit } => write!(
                f,
                "record count {} exceeds the synchronous limit of {}",
                requested, limit
            ),
            LimitViolation::QueuedJobs { limit } => {
                write!(f, "queue is full ({} jobs)", limit)
            }
            LimitViolation::RecordsInFlight {
                requested,
                in_flight,
                limit,
            } => write!(
                f,
                "{} requested records with {} in flight exceed the limit of {}",
                requested, in_flight, limit
            ),
            LimitViolation::RateLimited {
                caller,
                retry_after,
            } => write!(
                f,
                "caller '{}' must wait {}s before queuing another job",
                caller,
                retry_after.as_secs().max(1)
            ),
        }
    }
}

/// Aggregate load at the moment of admission.
#[derive(Debug, Clone, Copy, Default)]
pub struct Load {
    pub active_jobs: usize,
    pub records_in_flight: u64,
    /// Time since the caller's last admitted job.
    pub since_last_admission: Option<Duration>,
}

/// A job asking to be admitted.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionRequest<'a> {
    pub count: u64,
    pub caller: &'a str,
    /// Whether the job runs through the synchronous path.
    pub sync: bool,
}

/// Returns every limit `request` would violate under `load`.
pub fn evaluate(limits: &LimitsConfig, request: &AdmissionRequest<'_>, load: &Load) -> Vec<LimitViolation> {
    let mut violations = Vec::new();

    if let Some(limit) = limits.max_records_per_job {
        if request.count > limit {
            violations.push(LimitViolation::RecordsPerJob {
                requested: request.count,
                limit,
            });
        }
    }

    if request.sync {
        if let Some(limit) = limits.max_sync_records_per_job {
            if request.count > limit {
                violations.push(LimitViolation::SyncRecordsPerJob {
                    requested: request.count,
                    limit,
                });
            }
        }
    }

    if let Some(limit) = limits.max_queued_jobs {
        if load.active_jobs >= limit {
            violations.push(LimitViolation::QueuedJobs { limit });
        }
    }

    if let Some(limit) = limits.max_records_in_flight {
        if load.records_in_flight.saturating_add(request.count) > limit {
            violations.push(LimitViolation::RecordsInFlight {
                requested: request.count,
                in_flight: load.records_in_flight,
                limit,
            });
        }
    }

    if let (Some(min), Some(since)) = (limits.min_time_between_jobs, load.since_last_admission) {
        if since < min {
            violations.push(LimitViolation::RateLimited {
                caller: request.caller.to_string(),
                retry_after: min - since,
            });
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(count: u64) -> AdmissionRequest<'static> {
        AdmissionRequest {
            count,
            caller: "10.0.0.1",
            sync: false,
        }
    }

    #[test]
    fn test_no_limits_admit_everything() {
        let load = Load {
            active_jobs: 1_000,
            records_in_flight: u64::MAX,
            since_last_admission: Some(Duration::ZERO),
        };
        assert!(evaluate(&LimitsConfig::default(), &request(u64::MAX), &load).is_empty());
    }

    #[test]
    fn test_queue_limit_counts_active_jobs() {
        let limits = LimitsConfig {
            max_queued_jobs: Some(2),
            ..Default::default()
        };
        let one = Load {
            active_jobs: 1,
            ..Default::default()
        };
        let two = Load {
            active_jobs: 2,
            ..Default::default()
        };

        assert!(evaluate(&limits, &request(1), &one).is_empty());
        assert_eq!(
            evaluate(&limits, &request(1), &two),
            vec![LimitViolation::QueuedJobs { limit: 2 }]
        );
    }

    #[test]
    fn test_all_violations_are_reported() {
        let limits = LimitsConfig {
            max_records_per_job: Some(100),
            max_sync_records_per_job: Some(10),
            max_records_in_flight: Some(150),
            min_time_between_jobs: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let load = Load {
            active_jobs: 3,
            records_in_flight: 100,
            since_last_admission: Some(Duration::from_secs(2)),
        };
        let request = AdmissionRequest {
            count: 120,
            caller: "10.0.0.1",
            sync: true,
        };

        let reasons: Vec<_> = evaluate(&limits, &request, &load)
            .iter()
            .map(LimitViolation::reason)
            .collect();
        assert_eq!(
            reasons,
            vec![
                "records_per_job",
                "sync_records_per_job",
                "records_in_flight",
                "rate_limited"
            ]
        );
    }

    #[test]
    fn test_sync_limit_ignored_for_async_jobs() {
        let limits = LimitsConfig {
            max_sync_records_per_job: Some(10),
            ..Default::default()
        };
        assert!(evaluate(&limits, &request(50), &Load::default()).is_empty());
    }

    #[test]
    fn test_rate_limit_message() {
        let violation = LimitViolation::RateLimited {
            caller: "10.0.0.1".to_string(),
            retry_after: Duration::from_millis(2_500),
        };
        assert_eq!(
            violation.to_string(),
            "caller '10.0.0.1' must wait 2s before queuing another job"
        );
    }
}
