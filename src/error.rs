//! Error types for recordforge operations.
//!
//! Errors are split along the tiers the engine distinguishes:
//! - Configuration errors, raised while a job is configured and before any
//!   worker is launched
//! - Per-record generation errors, which skip a single sequence number
//! - Stage errors from sinks and persistence backends
//! - Job, queue and registry errors surfaced by the state machine and manager

use thiserror::Error;
use uuid::Uuid;

use crate::model::FieldKind;
use crate::pipeline::JobStatus;
use crate::registry::LimitViolation;

/// Errors raised while resolving a job's configuration.
///
/// A job that fails configuration stays `Uninitialized`.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Job cannot be configured from status '{0}'")]
    NotConfigurable(JobStatus),

    #[error("Specification '{0}' is not valid")]
    UnknownSpecification(String),

    #[error("Invalid output format '{0}'")]
    UnknownOutputFormat(String),

    #[error("Invalid filter '{0}'")]
    UnknownFilter(String),

    #[error("Record count must be at least 1")]
    InvalidCount,

    #[error("No generator available for field '{field}' of type {kind}")]
    NoGenerator { field: String, kind: FieldKind },

    #[error("Field '{0}' is linked to a linker that is not registered")]
    NoLinker(String),

    #[error("Sequence number field '{field}' is invalid: {reason}")]
    InvalidSequenceField { field: String, reason: String },

    #[error("Field '{field}' links to '{source_field}', which is not declared before it")]
    InvalidLink { field: String, source_field: String },

    #[error("Missing stream parameter: {0}")]
    MissingStreamParameter(String),

    #[error("Failed to prepare stage: {0}")]
    Stage(#[from] StageError),
}

/// Errors raised while generating or transforming a single record.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generator '{generator}' failed for field '{field}': {reason}")]
    GeneratorFailed {
        generator: &'static str,
        field: String,
        reason: String,
    },

    #[error("Linker '{linker}' failed for field '{field}': {reason}")]
    LinkerFailed {
        linker: &'static str,
        field: String,
        reason: String,
    },

    #[error("No generator available for field '{0}'")]
    NoGenerator(String),

    #[error("{0}")]
    Invalid(String),
}

impl GenerationError {
    /// Attaches a field name to an error raised without one.
    pub fn for_field(self, field: &str) -> Self {
        match self {
            Self::GeneratorFailed {
                generator, reason, ..
            } => Self::GeneratorFailed {
                generator,
                field: field.to_string(),
                reason,
            },
            Self::LinkerFailed { linker, reason, .. } => Self::LinkerFailed {
                linker,
                field: field.to_string(),
                reason,
            },
            other => other,
        }
    }
}

/// Errors raised by sink and persistence stages.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Stage is not prepared")]
    NotPrepared,
}

/// Errors raised by the job state machine.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job {id} cannot execute from status '{status}'")]
    NotPending { id: Uuid, status: JobStatus },

    #[error("Job {id} configuration is frozen in status '{status}'")]
    ConfigFrozen { id: Uuid, status: JobStatus },
}

/// Errors raised when a job is handed to the manager.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Job {0} is not configured")]
    NotConfigured(Uuid),

    #[error("Job {0} is already queued")]
    Duplicate(Uuid),

    #[error("Job rejected: {}", format_violations(.0))]
    Rejected(Vec<LimitViolation>),

    #[error("Failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Errors raised by registry lookups and removal.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Job {id} is still active ({status})")]
    StillActive { id: Uuid, status: JobStatus },
}

fn format_violations(violations: &[LimitViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_for_field() {
        let err = GenerationError::LinkerFailed {
            linker: "years_since_date",
            field: String::new(),
            reason: "bad date".to_string(),
        }
        .for_field("Age");

        assert_eq!(
            err.to_string(),
            "Linker 'years_since_date' failed for field 'Age': bad date"
        );
    }

    #[test]
    fn test_rejected_lists_every_violation() {
        let err = QueueError::Rejected(vec![
            LimitViolation::RecordsPerJob {
                requested: 10,
                limit: 5,
            },
            LimitViolation::QueuedJobs { limit: 2 },
        ]);

        let message = err.to_string();
        assert!(message.contains("count 10 exceeds"));
        assert!(message.contains("2 jobs"));
    }
}
