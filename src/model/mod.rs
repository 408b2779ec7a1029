//! Passive data model shared by every pipeline stage.
//!
//! - [`FieldSpec`] and [`GeneratorOptions`]: declarative per-field metadata
//! - [`Specification`]: a named, ordered schema of fields
//! - [`Record`] and [`FieldValue`]: generated data
//! - [`SinkArtifact`] and [`PersistenceResult`]: byproducts of a job
//! - [`Caller`]: who queued or canceled a job

pub mod artifact;
pub mod caller;
pub mod field;
pub mod record;
pub mod specification;
pub mod value;

pub use artifact::{ArtifactSummary, BackendKind, PersistenceResult, SinkArtifact};
pub use caller::Caller;
pub use field::{FieldKind, FieldSpec, GeneratorKind, GeneratorOptions, LinkSpec, LinkerKind};
pub use record::{Record, RecordView};
pub use specification::{Specification, SpecificationKind, DEFAULT_DATE_FORMAT};
pub use value::{Decimal, FieldValue};
