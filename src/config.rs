//! Process-level configuration.
//!
//! [`ServiceConfig`] carries the admission limits, backend locations and
//! stream settings shared by every job a [`crate::registry::JobManager`]
//! runs. All values are optional and loaded from `RECORDFORGE_*`
//! environment variables.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::model::BackendKind;
use crate::pipeline::BackendConfig;

/// Lowest accepted timeout for the synchronous run path.
pub const MIN_SYNC_RUN_SECS: u64 = 60;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection settings for the live stream sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    /// Redis connection URL, e.g. `redis://localhost:6379`.
    pub url: String,
}

impl StreamSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Admission limits. `None` disables a limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitsConfig {
    pub max_records_per_job: Option<u64>,
    /// Record limit for jobs run synchronously to completion.
    pub max_sync_records_per_job: Option<u64>,
    /// Maximum number of non-terminal jobs.
    pub max_queued_jobs: Option<usize>,
    /// Maximum records still to be produced across all active jobs.
    pub max_records_in_flight: Option<u64>,
    /// Minimum time between admitted jobs from the same caller.
    pub min_time_between_jobs: Option<Duration>,
}

/// Configuration for the job manager and its stages.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub limits: LimitsConfig,
    /// Timeout of the synchronous run path.
    pub max_sync_run_time: Duration,
    /// Retention window for completed jobs; `None` keeps them until removed.
    pub completed_job_expiry: Option<Duration>,
    pub sweep_interval: Duration,
    /// Directory used by the filesystem backend.
    pub persist_dir: PathBuf,
    /// Directory used by the archive backend; unset leaves it unconfigured.
    pub archive_dir: Option<PathBuf>,
    pub archive_compress: bool,
    pub stream: Option<StreamSettings>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            limits: LimitsConfig::default(),
            max_sync_run_time: Duration::from_secs(MIN_SYNC_RUN_SECS),
            completed_job_expiry: None,
            sweep_interval: Duration::from_secs(5),
            persist_dir: PathBuf::from("."),
            archive_dir: None,
            archive_compress: true,
            stream: None,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RECORDFORGE_MAX_RECORDS_PER_JOB`: Max records per job (default: unlimited)
    /// - `RECORDFORGE_MAX_SYNC_RECORDS_PER_JOB`: Max records for synchronous runs (default: unlimited)
    /// - `RECORDFORGE_MAX_QUEUED_JOBS`: Max active jobs (default: unlimited)
    /// - `RECORDFORGE_MAX_RECORDS_IN_FLIGHT`: Max outstanding records (default: unlimited)
    /// - `RECORDFORGE_MIN_SECS_BETWEEN_JOBS`: Per-caller rate limit (default: disabled)
    /// - `RECORDFORGE_MAX_SYNC_RUN_SECS`: Synchronous run timeout, at least 60 (default: 60)
    /// - `RECORDFORGE_COMPLETED_JOB_EXPIRY_SECS`: Completed job retention (default: disabled)
    /// - `RECORDFORGE_SWEEP_INTERVAL_SECS`: Expiry sweep period (default: 5)
    /// - `RECORDFORGE_PERSIST_DIR`: Filesystem backend directory (default: .)
    /// - `RECORDFORGE_ARCHIVE_DIR`: Archive backend directory (default: unset)
    /// - `RECORDFORGE_ARCHIVE_COMPRESS`: Gzip archived artifacts (default: true)
    /// - `RECORDFORGE_STREAM_URL`: Redis URL for the stream sink (default: unset)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Limits
        if let Some(val) = lookup("RECORDFORGE_MAX_RECORDS_PER_JOB") {
            config.limits.max_records_per_job =
                Some(parse_env_value(&val, "RECORDFORGE_MAX_RECORDS_PER_JOB")?);
        }

        if let Some(val) = lookup("RECORDFORGE_MAX_SYNC_RECORDS_PER_JOB") {
            config.limits.max_sync_records_per_job =
                Some(parse_env_value(&val, "RECORDFORGE_MAX_SYNC_RECORDS_PER_JOB")?);
        }

        if let Some(val) = lookup("RECORDFORGE_MAX_QUEUED_JOBS") {
            config.limits.max_queued_jobs =
                Some(parse_env_value(&val, "RECORDFORGE_MAX_QUEUED_JOBS")?);
        }

        if let Some(val) = lookup("RECORDFORGE_MAX_RECORDS_IN_FLIGHT") {
            config.limits.max_records_in_flight =
                Some(parse_env_value(&val, "RECORDFORGE_MAX_RECORDS_IN_FLIGHT")?);
        }

        if let Some(val) = lookup("RECORDFORGE_MIN_SECS_BETWEEN_JOBS") {
            let secs: u64 = parse_env_value(&val, "RECORDFORGE_MIN_SECS_BETWEEN_JOBS")?;
            config.limits.min_time_between_jobs = (secs > 0).then(|| Duration::from_secs(secs));
        }

        // Lifetimes
        if let Some(val) = lookup("RECORDFORGE_MAX_SYNC_RUN_SECS") {
            let secs: u64 = parse_env_value(&val, "RECORDFORGE_MAX_SYNC_RUN_SECS")?;
            config.max_sync_run_time = Duration::from_secs(secs.max(MIN_SYNC_RUN_SECS));
        }

        if let Some(val) = lookup("RECORDFORGE_COMPLETED_JOB_EXPIRY_SECS") {
            let secs: u64 = parse_env_value(&val, "RECORDFORGE_COMPLETED_JOB_EXPIRY_SECS")?;
            config.completed_job_expiry = Some(Duration::from_secs(secs));
        }

        if let Some(val) = lookup("RECORDFORGE_SWEEP_INTERVAL_SECS") {
            let secs: u64 = parse_env_value(&val, "RECORDFORGE_SWEEP_INTERVAL_SECS")?;
            config.sweep_interval = Duration::from_secs(secs);
        }

        // Backends
        if let Some(val) = lookup("RECORDFORGE_PERSIST_DIR") {
            config.persist_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("RECORDFORGE_ARCHIVE_DIR") {
            config.archive_dir = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("RECORDFORGE_ARCHIVE_COMPRESS") {
            config.archive_compress = parse_env_bool(&val, "RECORDFORGE_ARCHIVE_COMPRESS")?;
        }

        if let Some(val) = lookup("RECORDFORGE_STREAM_URL") {
            config.stream = Some(StreamSettings::new(val));
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "sweep_interval must be greater than 0".to_string(),
            ));
        }

        if self.max_sync_run_time < Duration::from_secs(MIN_SYNC_RUN_SECS) {
            return Err(ConfigError::ValidationFailed(format!(
                "max_sync_run_time must be at least {} seconds",
                MIN_SYNC_RUN_SECS
            )));
        }

        if let (Some(sync), Some(limit)) = (
            self.limits.max_sync_records_per_job,
            self.limits.max_records_per_job,
        ) {
            if sync > limit {
                return Err(ConfigError::ValidationFailed(
                    "max_sync_records_per_job cannot exceed max_records_per_job".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Backend configurations for a job using every backend this service
    /// has a location for.
    pub fn backends(&self) -> Vec<(BackendKind, BackendConfig)> {
        let mut backends = vec![(
            BackendKind::Filesystem,
            BackendConfig::new(self.persist_dir.clone()),
        )];
        if let Some(dir) = &self.archive_dir {
            backends.push((
                BackendKind::Archive,
                BackendConfig::new(dir.clone()).with_compress(self.archive_compress),
            ));
        }
        backends
    }

    // Builder methods

    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_completed_job_expiry(mut self, expiry: Duration) -> Self {
        self.completed_job_expiry = Some(expiry);
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_max_sync_run_time(mut self, timeout: Duration) -> Self {
        self.max_sync_run_time = timeout;
        self
    }

    pub fn with_persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = dir.into();
        self
    }

    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn with_stream(mut self, stream: StreamSettings) -> Self {
        self.stream = Some(stream);
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}
