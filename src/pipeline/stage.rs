//! Stage contracts driven by the job state machine.
//!
//! A job pulls one record per sequence number from its [`SourceStage`],
//! passes it through each [`FilterStage`] in order, then to every
//! [`SinkStage`]. Once all records are produced each sink is finished and
//! every artifact is handed to every [`PersistenceStage`].

use std::fmt;
use std::sync::{Arc, Mutex};

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GenerationError, StageError};
use crate::model::{BackendKind, PersistenceResult, Record, SinkArtifact, Specification};
use crate::utils::lock;

/// Produces one record per sequence number, indefinitely.
pub trait SourceStage: Send {
    fn specification(&self) -> &Specification;

    fn next(&mut self, rng: &mut ChaCha8Rng, sequence: u64) -> Result<Record, GenerationError>;
}

/// Perturbs records after the source and before the sinks.
pub trait FilterStage: Send {
    fn name(&self) -> &'static str;

    /// Called once before the first record. `false` removes the filter.
    fn prepare(&mut self) -> bool;

    /// Offers a record. `true` means [`FilterStage::next`] returns its replacement.
    fn sink(&mut self, record: &Record) -> bool;

    fn next(&mut self, rng: &mut ChaCha8Rng, sequence: u64) -> Result<Record, GenerationError>;
}

/// Renders records into an artifact.
pub trait SinkStage: Send {
    fn name(&self) -> &'static str;

    /// Called once before the first record. `false` excludes the sink.
    fn prepare(&mut self) -> bool;

    /// Called once per record, in sequence order.
    fn sink(&mut self, record: &Record) -> bool;

    /// Called exactly once after the last record. Sinks without a
    /// retrievable output return `None`.
    fn finish(&mut self) -> Result<Option<SinkArtifact>, StageError>;
}

/// Durably stores sink artifacts.
pub trait PersistenceStage: Send {
    fn backend(&self) -> BackendKind;

    /// Shared view of this stage's status, readable while it runs.
    fn status(&self) -> StatusCell;

    fn persist(&mut self, artifact: &SinkArtifact, extra: &Map<String, Value>) -> PersistenceResult;
}

/// Progress of a persistence stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersistenceStatus {
    /// Construction could not validate the backend; the stage is excluded.
    Invalid,
    Configured,
    Compressing,
    Uploading,
    CleaningUp,
    Success,
    Errored,
}

impl fmt::Display for PersistenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PersistenceStatus::Invalid => "invalid",
            PersistenceStatus::Configured => "configured",
            PersistenceStatus::Compressing => "compressing",
            PersistenceStatus::Uploading => "uploading",
            PersistenceStatus::CleaningUp => "cleaningUp",
            PersistenceStatus::Success => "success",
            PersistenceStatus::Errored => "errored",
        };
        write!(f, "{}", name)
    }
}

/// Persistence status shared between a stage and status queries.
#[derive(Debug, Clone)]
pub struct StatusCell(Arc<Mutex<PersistenceStatus>>);

impl StatusCell {
    pub fn new(status: PersistenceStatus) -> Self {
        Self(Arc::new(Mutex::new(status)))
    }

    pub fn get(&self) -> PersistenceStatus {
        *lock(&self.0)
    }

    pub fn set(&self, status: PersistenceStatus) {
        *lock(&self.0) = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cell_is_shared() {
        let cell = StatusCell::new(PersistenceStatus::Configured);
        let view = cell.clone();

        cell.set(PersistenceStatus::Uploading);
        assert_eq!(view.get(), PersistenceStatus::Uploading);
    }
}
