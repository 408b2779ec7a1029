//! Field generation and linking.
//!
//! Generators produce a value for a field from its options; linkers derive a
//! value from an earlier field of the same record. Both are looked up through
//! a [`GeneratorRegistry`], built once at startup and read-only afterwards:
//!
//! 1. **Defaults** - exactly one generator per [`FieldKind`]
//! 2. **Overrides** - generators a field names explicitly via [`GeneratorKind`]
//! 3. **Linkers** - transforms a field names via [`LinkerKind`]
//!
//! # Example
//!
//! ```ignore
//! use recordforge::generator::GeneratorRegistry;
//! use recordforge::model::{FieldKind, FieldSpec};
//!
//! let registry = GeneratorRegistry::shared()?;
//! let generator = registry.resolve(&FieldSpec::new("Age", FieldKind::Int))?;
//! let value = generator.generate(&mut rng, &options)?;
//! ```

pub mod custom;
pub mod defaults;
pub mod linkers;
pub mod words;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::error::{ConfigurationError, GenerationError};
use crate::model::{FieldKind, FieldSpec, FieldValue, GeneratorKind, GeneratorOptions, LinkerKind};

pub use custom::FormattedGenerator;

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// Produces a value for a field from its options.
pub trait FieldGenerator: Send + Sync {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &'static str;

    fn generate(&self, rng: &mut ChaCha8Rng, options: &GeneratorOptions) -> Result<FieldValue>;
}

/// Derives a field's value from the value of an earlier field.
pub trait FieldLinker: Send + Sync {
    fn name(&self) -> &'static str;

    fn link(
        &self,
        rng: &mut ChaCha8Rng,
        source: &FieldValue,
        options: &GeneratorOptions,
    ) -> Result<FieldValue>;
}

/// Errors raised while building a registry.
#[derive(Debug, Error)]
pub enum RegistryBuildError {
    #[error("No default generator registered for field type {0}")]
    MissingDefault(FieldKind),
}

/// Startup-built mapping from field metadata to generator and linker implementations.
#[derive(Clone)]
pub struct GeneratorRegistry {
    defaults: HashMap<FieldKind, Arc<dyn FieldGenerator>>,
    overrides: HashMap<GeneratorKind, Arc<dyn FieldGenerator>>,
    linkers: HashMap<LinkerKind, Arc<dyn FieldLinker>>,
}

static SHARED: OnceLock<Arc<GeneratorRegistry>> = OnceLock::new();

impl GeneratorRegistry {
    pub fn builder() -> GeneratorRegistryBuilder {
        GeneratorRegistryBuilder::default()
    }

    /// Builds a registry with every built-in generator and linker.
    pub fn builtin() -> std::result::Result<Self, RegistryBuildError> {
        let mut builder = Self::builder();
        for (kind, generator) in defaults::all() {
            builder = builder.with_default(kind, generator);
        }
        for (kind, generator) in custom::all() {
            builder = builder.with_override(kind, generator);
        }
        for (kind, linker) in linkers::all() {
            builder = builder.with_linker(kind, linker);
        }
        builder.build()
    }

    /// Process-wide built-in registry, built on first use.
    pub fn shared() -> std::result::Result<Arc<Self>, RegistryBuildError> {
        if let Some(registry) = SHARED.get() {
            return Ok(registry.clone());
        }
        let registry = Arc::new(Self::builtin()?);
        Ok(SHARED.get_or_init(|| registry).clone())
    }

    pub fn default_for(&self, kind: FieldKind) -> Option<Arc<dyn FieldGenerator>> {
        self.defaults.get(&kind).cloned()
    }

    pub fn by_kind(&self, kind: GeneratorKind) -> Option<Arc<dyn FieldGenerator>> {
        self.overrides.get(&kind).cloned()
    }

    pub fn linker(&self, kind: LinkerKind) -> Option<Arc<dyn FieldLinker>> {
        self.linkers.get(&kind).cloned()
    }

    /// Resolves the generator for a field: its override, else its type default.
    pub fn resolve(
        &self,
        field: &FieldSpec,
    ) -> std::result::Result<Arc<dyn FieldGenerator>, ConfigurationError> {
        field
            .generator
            .and_then(|kind| self.by_kind(kind))
            .or_else(|| self.default_for(field.kind))
            .ok_or_else(|| ConfigurationError::NoGenerator {
                field: field.name.clone(),
                kind: field.kind,
            })
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("defaults", &self.defaults.len())
            .field("overrides", &self.overrides.len())
            .field("linkers", &self.linkers.len())
            .finish()
    }
}

/// Builder for [`GeneratorRegistry`].
#[derive(Default)]
pub struct GeneratorRegistryBuilder {
    defaults: HashMap<FieldKind, Arc<dyn FieldGenerator>>,
    overrides: HashMap<GeneratorKind, Arc<dyn FieldGenerator>>,
    linkers: HashMap<LinkerKind, Arc<dyn FieldLinker>>,
}

impl GeneratorRegistryBuilder {
    pub fn with_default(mut self, kind: FieldKind, generator: Arc<dyn FieldGenerator>) -> Self {
        self.defaults.insert(kind, generator);
        self
    }

    pub fn with_override(mut self, kind: GeneratorKind, generator: Arc<dyn FieldGenerator>) -> Self {
        self.overrides.insert(kind, generator);
        self
    }

    pub fn with_linker(mut self, kind: LinkerKind, linker: Arc<dyn FieldLinker>) -> Self {
        self.linkers.insert(kind, linker);
        self
    }

    /// Finalizes the registry. Every field kind must have a default.
    pub fn build(self) -> std::result::Result<GeneratorRegistry, RegistryBuildError> {
        if let Some(missing) = FieldKind::ALL
            .into_iter()
            .find(|kind| !self.defaults.contains_key(kind))
        {
            return Err(RegistryBuildError::MissingDefault(missing));
        }
        Ok(GeneratorRegistry {
            defaults: self.defaults,
            overrides: self.overrides,
            linkers: self.linkers,
        })
    }
}
