//! Local filesystem persistence.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::naming::ArtifactNamer;
use crate::error::StageError;
use crate::model::{BackendKind, PersistenceResult, SinkArtifact, Specification};
use crate::pipeline::{BackendConfig, JobConfig, PersistenceStage, PersistenceStatus, StatusCell};

/// Copies each artifact into a directory under its generated name.
pub struct FilesystemPersister {
    job_id: Uuid,
    directory: PathBuf,
    specification: String,
    namer: ArtifactNamer,
    status: StatusCell,
}

impl FilesystemPersister {
    /// The stage is configured only if `backend.directory` is an existing
    /// directory.
    pub fn new(config: &JobConfig, backend: &BackendConfig, specification: &Specification) -> Self {
        let status = if backend.directory.is_dir() {
            PersistenceStatus::Configured
        } else {
            PersistenceStatus::Invalid
        };
        Self {
            job_id: config.id.unwrap_or_else(Uuid::nil),
            directory: backend.directory.clone(),
            specification: specification.name.to_lowercase(),
            namer: ArtifactNamer::new(config, specification),
            status: StatusCell::new(status),
        }
    }

    pub fn with_namer(mut self, namer: ArtifactNamer) -> Self {
        self.namer = namer;
        self
    }

    fn store(&self, artifact: &SinkArtifact) -> Result<(PathBuf, u64), StageError> {
        let target = self.directory.join(self.namer.name(artifact));
        let size = fs::copy(artifact.path(), &target)?;
        Ok((target, size))
    }
}

impl PersistenceStage for FilesystemPersister {
    fn backend(&self) -> BackendKind {
        BackendKind::Filesystem
    }

    fn status(&self) -> StatusCell {
        self.status.clone()
    }

    fn persist(&mut self, artifact: &SinkArtifact, extra: &Map<String, Value>) -> PersistenceResult {
        self.status.set(PersistenceStatus::Uploading);
        match self.store(artifact) {
            Ok((path, size)) => {
                debug!(job_id = %self.job_id, path = %path.display(), size, "Artifact copied");
                let mut metadata = extra.clone();
                metadata.insert("id".to_string(), json!(artifact.id));
                metadata.insert("specification".to_string(), json!(self.specification));
                metadata.insert("recordCount".to_string(), json!(artifact.record_count));
                metadata.insert("sizeBytes".to_string(), json!(size));
                metadata.insert("path".to_string(), json!(path_string(&path)));
                self.status.set(PersistenceStatus::Success);
                PersistenceResult::succeeded(self.job_id, BackendKind::Filesystem, metadata)
            }
            Err(e) => {
                self.status.set(PersistenceStatus::Errored);
                PersistenceResult::failed(self.job_id, BackendKind::Filesystem, e.to_string())
            }
        }
    }
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}
