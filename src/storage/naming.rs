//! Persisted artifact names.
//!
//! Names follow `[prefix-]ABC{count}-{cfg}-{timestamp}-{artifact}.{kind}`:
//! the first three letters of the specification and the record count, four
//! characters of the job id, the stage construction time and four
//! characters of the artifact id. Everything before the extension is
//! upper-cased.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{SinkArtifact, Specification};
use crate::pipeline::JobConfig;

/// Characters taken from each identifier.
pub const ID_PREFIX_LEN: usize = 4;

/// Sortable timestamp layout, e.g. `031524T1405Z`.
pub const TIMESTAMP_FORMAT: &str = "%m%d%yT%H%MZ";

#[derive(Debug, Clone)]
pub struct ArtifactNamer {
    prefix: String,
    timestamp: String,
}

impl ArtifactNamer {
    pub fn new(config: &JobConfig, specification: &Specification) -> Self {
        let job_id = config.id.unwrap_or_else(Uuid::nil);
        let mut prefix = String::new();
        if let Some(user) = &config.user_prefix {
            prefix.push_str(user);
            prefix.push('-');
        }
        prefix.push_str(&format!(
            "{}{}-{}",
            specification.abbreviation(),
            config.count,
            short_id(job_id)
        ));
        Self {
            prefix,
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = at.format(TIMESTAMP_FORMAT).to_string();
        self
    }

    pub fn name(&self, artifact: &SinkArtifact) -> String {
        self.name_for(artifact.id, &artifact.kind)
    }

    pub fn name_for(&self, artifact_id: Uuid, kind: &str) -> String {
        let stem = format!("{}-{}-{}", self.prefix, self.timestamp, short_id(artifact_id));
        format!("{}.{}", stem.to_uppercase(), kind.to_lowercase())
    }
}

fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..ID_PREFIX_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpecificationKind;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 5, 0)
            .single()
            .expect("timestamp should be valid")
    }

    fn config(count: u64) -> JobConfig {
        let mut config = JobConfig::new("CensusData", count);
        config.id = Some(Uuid::parse_str("abcdef01-0000-4000-8000-000000000000").expect("uuid"));
        config
    }

    #[test]
    fn test_name_layout() {
        let spec = SpecificationKind::CensusData.specification();
        let namer = ArtifactNamer::new(&config(50), &spec).with_timestamp(fixed_time());
        let artifact_id =
            Uuid::parse_str("1234abcd-0000-4000-8000-000000000000").expect("uuid");

        let name = namer.name_for(artifact_id, "CSV");
        assert!(name.starts_with("CEN50-"));
        assert_eq!(name, "CEN50-ABCD-031524T1405Z-1234.csv");
    }

    #[test]
    fn test_user_prefix_leads() {
        let spec = SpecificationKind::Names.specification();
        let namer = ArtifactNamer::new(&config(7).with_user_prefix("qa-team"), &spec)
            .with_timestamp(fixed_time());

        let name = namer.name_for(Uuid::nil(), "json");
        assert!(name.starts_with("QATEAM-NAM7-ABCD-"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn test_naming_is_deterministic() {
        let spec = SpecificationKind::CensusData.specification();
        let a = ArtifactNamer::new(&config(50), &spec).with_timestamp(fixed_time());
        let b = ArtifactNamer::new(&config(50), &spec).with_timestamp(fixed_time());
        let id = Uuid::new_v4();
        assert_eq!(a.name_for(id, "txt"), b.name_for(id, "txt"));
    }
}
