//! Per-job configuration.
//!
//! A [`JobConfig`] names what to generate (specification and count), how to
//! encode it (output format and filters) and where to persist it. Names are
//! resolved once, when the job is configured; after that the configuration
//! is frozen.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::model::BackendKind;

/// Maximum length of a sanitized artifact-name prefix.
pub const MAX_USER_PREFIX_LEN: usize = 32;

/// Extra key naming the channel a stream sink publishes to.
pub const STREAM_ID_KEY: &str = "streamId";

/// Output encodings a job can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    Txt,
    /// Live publication of each record, paired with a CSV artifact.
    Stream,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Csv,
        OutputFormat::Json,
        OutputFormat::Txt,
        OutputFormat::Stream,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Txt => "txt",
            OutputFormat::Stream => "stream",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Intermediate filters a job can chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    RandomFieldCorruptor,
    SequenceNumberCorruptor,
}

impl FilterKind {
    pub const ALL: [FilterKind; 2] = [
        FilterKind::RandomFieldCorruptor,
        FilterKind::SequenceNumberCorruptor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::RandomFieldCorruptor => "RandomFieldCorruptor",
            FilterKind::SequenceNumberCorruptor => "SequenceNumberCorruptor",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Settings for one persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Directory artifacts are written to.
    pub directory: PathBuf,
    /// Gzip artifacts before storing them (archive backend only).
    #[serde(default = "default_compress")]
    pub compress: bool,
}

fn default_compress() -> bool {
    true
}

impl BackendConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            compress: true,
        }
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Configuration of a single job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobConfig {
    /// Job id, assigned when the job is configured.
    pub id: Option<Uuid>,
    /// Number of records to generate.
    pub count: u64,
    /// Name of the specification to generate.
    pub specification: String,
    /// Name of the output format.
    pub output_format: String,
    /// Filter names, applied in order.
    pub filters: Vec<String>,
    /// Sanitized prefix for persisted artifact names.
    #[serde(deserialize_with = "deserialize_prefix")]
    pub user_prefix: Option<String>,
    /// Sink-specific parameters, e.g. `streamId`.
    pub extra: HashMap<String, String>,
    /// Persistence backends keyed by kind.
    pub persistence: BTreeMap<BackendKind, BackendConfig>,
    /// Seed for the worker's random number generator.
    pub seed: Option<u64>,
    /// Fraction of records that may fail generation before the job fails.
    pub max_skipped_ratio: f64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            id: None,
            count: 100,
            specification: "CensusData".to_string(),
            output_format: "csv".to_string(),
            filters: Vec::new(),
            user_prefix: None,
            extra: HashMap::new(),
            persistence: BTreeMap::new(),
            seed: None,
            max_skipped_ratio: 0.05,
        }
    }
}

impl JobConfig {
    pub fn new(specification: impl Into<String>, count: u64) -> Self {
        Self {
            specification: specification.into(),
            count,
            ..Default::default()
        }
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn with_user_prefix(mut self, prefix: &str) -> Self {
        self.user_prefix = sanitize_prefix(prefix);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_backend(mut self, kind: BackendKind, backend: BackendConfig) -> Self {
        self.persistence.insert(kind, backend);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_skipped_ratio(mut self, ratio: f64) -> Self {
        self.max_skipped_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Skipped records tolerated before the job is failed.
    pub fn allowed_skips(&self) -> u64 {
        (self.count as f64 * self.max_skipped_ratio.clamp(0.0, 1.0)).floor() as u64
    }
}

/// Strips everything but ASCII letters and digits and caps the length.
pub fn sanitize_prefix(prefix: &str) -> Option<String> {
    let cleaned: String = prefix
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_USER_PREFIX_LEN)
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn deserialize_prefix<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(sanitize_prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_config_defaults() {
        let config = JobConfig::default();
        assert_eq!(config.count, 100);
        assert_eq!(config.specification, "CensusData");
        assert_eq!(config.output_format, "csv");
        assert!(config.filters.is_empty());
        assert!(config.id.is_none());
    }

    #[test]
    fn test_sanitize_prefix() {
        assert_eq!(sanitize_prefix("team-a_01!"), Some("teama01".to_string()));
        assert_eq!(sanitize_prefix("--"), None);
        let long = "x".repeat(40);
        assert_eq!(sanitize_prefix(&long).map(|p| p.len()), Some(MAX_USER_PREFIX_LEN));
    }

    #[test]
    fn test_deserialize_sanitizes_prefix() {
        let config: JobConfig = serde_json::from_str(
            r#"{"count": 5, "userPrefix": "qa team", "persistence": {"filesystem": {"directory": "/tmp"}}}"#,
        )
        .expect("config should deserialize");

        assert_eq!(config.count, 5);
        assert_eq!(config.user_prefix, Some("qateam".to_string()));
        assert_eq!(config.specification, "CensusData");
        let backend = &config.persistence[&BackendKind::Filesystem];
        assert!(backend.compress);
    }

    #[test]
    fn test_format_and_filter_lookup() {
        assert_eq!(OutputFormat::from_name("JSON"), Some(OutputFormat::Json));
        assert!(OutputFormat::from_name("xml").is_none());
        assert_eq!(
            FilterKind::from_name("randomfieldcorruptor"),
            Some(FilterKind::RandomFieldCorruptor)
        );
        assert!(FilterKind::from_name("Shuffle").is_none());
    }

    #[test]
    fn test_allowed_skips() {
        let config = JobConfig::new("Names", 100).with_max_skipped_ratio(0.05);
        assert_eq!(config.allowed_skips(), 5);
        let strict = JobConfig::new("Names", 100).with_max_skipped_ratio(0.0);
        assert_eq!(strict.allowed_skips(), 0);
    }
}
