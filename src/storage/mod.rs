//! Persistence stages.
//!
//! Each backend named in a job's `persistence` map becomes one
//! [`PersistenceStage`]:
//!
//! - **filesystem**: copies artifacts into a local directory
//! - **archive**: stores optionally gzipped artifacts next to a JSON
//!   metadata sidecar carrying a SHA-256 checksum
//!
//! A backend that cannot validate its configuration reports
//! [`PersistenceStatus::Invalid`] and is left out of the job.
//!
//! # Usage
//!
//! ```rust,ignore
//! use recordforge::storage::build_persisters;
//!
//! let persisters = build_persisters(&config, &specification);
//! for persister in &persisters {
//!     println!("{} is {}", persister.backend(), persister.status().get());
//! }
//! ```

pub mod archive;
pub mod filesystem;
pub mod naming;

use tracing::info;

use crate::model::{BackendKind, Specification};
use crate::pipeline::{JobConfig, PersistenceStage, PersistenceStatus};

pub use archive::{ArchivePersister, HashingWriter};
pub use filesystem::FilesystemPersister;
pub use naming::ArtifactNamer;

/// Builds the configured persistence stages of a job, dropping any that
/// failed to configure.
pub fn build_persisters(
    config: &JobConfig,
    specification: &Specification,
) -> Vec<Box<dyn PersistenceStage>> {
    config
        .persistence
        .iter()
        .filter_map(|(kind, backend)| {
            let stage: Box<dyn PersistenceStage> = match kind {
                BackendKind::Filesystem => {
                    Box::new(FilesystemPersister::new(config, backend, specification))
                }
                BackendKind::Archive => {
                    Box::new(ArchivePersister::new(config, backend, specification))
                }
            };
            let status = stage.status().get();
            if status == PersistenceStatus::Configured {
                Some(stage)
            } else {
                info!(
                    backend = %kind,
                    directory = %backend.directory.display(),
                    status = %status,
                    "Persistence backend excluded"
                );
                None
            }
        })
        .collect()
}
