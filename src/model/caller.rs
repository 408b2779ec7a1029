//! Identity of whoever queued or canceled a job.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    /// Stable identity used for rate limiting, e.g. a client address.
    pub identity: String,
    /// Free-form description of the request, e.g. method and path.
    pub descriptor: String,
}

impl Caller {
    pub fn new(identity: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            descriptor: descriptor.into(),
        }
    }

    /// The caller used by in-process front ends such as the CLI.
    pub fn local(descriptor: impl Into<String>) -> Self {
        Self::new("local", descriptor)
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descriptor.is_empty() {
            write!(f, "{}", self.identity)
        } else {
            write!(f, "{} ({})", self.identity, self.descriptor)
        }
    }
}
