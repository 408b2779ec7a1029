//! Job lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a job.
///
/// Transitions are linear: `Uninitialized -> Pending -> Executing`, then
/// either `Persisting -> Success`, or `Canceled`, or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created but not yet configured.
    Uninitialized,
    /// Configured and waiting for a worker.
    Pending,
    /// Generating records.
    Executing,
    /// Handing artifacts to persistence stages.
    Persisting,
    Success,
    Canceled,
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Canceled | JobStatus::Failed
        )
    }

    /// Whether the job has been admitted and not yet finished.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobStatus::Pending | JobStatus::Executing | JobStatus::Persisting
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uninitialized => "uninitialized",
            JobStatus::Pending => "pending",
            JobStatus::Executing => "executing",
            JobStatus::Persisting => "persisting",
            JobStatus::Success => "success",
            JobStatus::Canceled => "canceled",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_and_active_are_disjoint() {
        let all = [
            JobStatus::Uninitialized,
            JobStatus::Pending,
            JobStatus::Executing,
            JobStatus::Persisting,
            JobStatus::Success,
            JobStatus::Canceled,
            JobStatus::Failed,
        ];
        for status in all {
            assert!(!(status.is_terminal() && status.is_active()), "{}", status);
        }
        assert!(!JobStatus::Uninitialized.is_active());
        assert!(!JobStatus::Uninitialized.is_terminal());
    }

    #[test]
    fn test_job_status_display() {
        assert_eq!(JobStatus::Success.to_string(), "success");
        assert_eq!(JobStatus::Persisting.to_string(), "persisting");
    }
}
