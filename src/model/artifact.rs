//! Sink artifacts and persistence results.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::TempPath;
use uuid::Uuid;

/// Persistence backends a job can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Copies artifacts into a local directory.
    Filesystem,
    /// Stores optionally compressed artifacts with checksum metadata.
    Archive,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Filesystem, BackendKind::Archive];

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Filesystem => "filesystem",
            BackendKind::Archive => "archive",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Output produced by a sink's `finish`.
///
/// The artifact owns its backing temporary file. Persistence stages borrow
/// it and open their own readers; [`SinkArtifact::cleanup`] consumes it and
/// removes the file.
#[derive(Debug)]
pub struct SinkArtifact {
    pub id: Uuid,
    /// Content kind, also used as the persisted file extension.
    pub kind: String,
    pub record_count: u64,
    path: TempPath,
}

impl SinkArtifact {
    pub fn new(kind: impl Into<String>, record_count: u64, path: TempPath) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            record_count,
            path,
        }
    }

    /// Locator of the artifact content.
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh reader positioned at the start of the content.
    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    pub fn size_bytes(&self) -> io::Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            id: self.id,
            kind: self.kind.clone(),
            record_count: self.record_count,
        }
    }

    /// Releases the backing file.
    pub fn cleanup(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Lightweight description of an artifact, kept after cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub id: Uuid,
    pub kind: String,
    pub record_count: u64,
}

/// Outcome of one persistence stage applied to one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceResult {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub job_id: Uuid,
    pub backend: BackendKind,
    pub success: bool,
    /// Backend-specific details (path, size, checksum, container...).
    pub metadata: Map<String, Value>,
}

impl PersistenceResult {
    pub fn succeeded(job_id: Uuid, backend: BackendKind, metadata: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            job_id,
            backend,
            success: true,
            metadata,
        }
    }

    pub fn failed(job_id: Uuid, backend: BackendKind, reason: impl Into<String>) -> Self {
        let mut metadata = Map::new();
        metadata.insert("error".to_string(), Value::String(reason.into()));
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            job_id,
            backend,
            success: false,
            metadata,
        }
    }
}
