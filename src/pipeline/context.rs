//! Shared collaborators used when configuring jobs.

use std::sync::Arc;

use crate::config::StreamSettings;
use crate::generator::{GeneratorRegistry, RegistryBuildError};

/// Everything a job needs from its surroundings to build its stages.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub registry: Arc<GeneratorRegistry>,
    /// Connection settings for the stream sink; `None` rejects the stream
    /// output format.
    pub stream: Option<StreamSettings>,
}

impl StageContext {
    pub fn new(registry: Arc<GeneratorRegistry>) -> Self {
        Self {
            registry,
            stream: None,
        }
    }

    /// A context backed by the process-wide built-in registry.
    pub fn builtin() -> Result<Self, RegistryBuildError> {
        Ok(Self::new(GeneratorRegistry::shared()?))
    }

    pub fn with_stream(mut self, stream: Option<StreamSettings>) -> Self {
        self.stream = stream;
        self
    }
}
