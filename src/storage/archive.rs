//! Archive persistence.
//!
//! Artifacts are streamed, gzipped when compression is on, into the archive
//! directory while a SHA-256 digest of the stored bytes is computed. A
//! `.meta.json` sidecar next to each blob records its metadata.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;
use uuid::Uuid;

use super::naming::ArtifactNamer;
use crate::error::StageError;
use crate::model::{BackendKind, PersistenceResult, SinkArtifact, Specification};
use crate::pipeline::{BackendConfig, JobConfig, PersistenceStage, PersistenceStatus, StatusCell};

/// A writer that hashes and counts everything passing through it.
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Returns the inner writer, the hex digest and the byte count.
    pub fn finish(self) -> (W, String, u64) {
        (self.inner, hex::encode(self.hasher.finalize()), self.written)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct StoredBlob {
    path: PathBuf,
    checksum: String,
    size: u64,
}

pub struct ArchivePersister {
    job_id: Uuid,
    directory: PathBuf,
    compress: bool,
    specification: String,
    namer: ArtifactNamer,
    status: StatusCell,
}

impl ArchivePersister {
    pub fn new(config: &JobConfig, backend: &BackendConfig, specification: &Specification) -> Self {
        let status = if backend.directory.is_dir() {
            PersistenceStatus::Configured
        } else {
            PersistenceStatus::Invalid
        };
        Self {
            job_id: config.id.unwrap_or_else(Uuid::nil),
            directory: backend.directory.clone(),
            compress: backend.compress,
            specification: specification.name.to_lowercase(),
            namer: ArtifactNamer::new(config, specification),
            status: StatusCell::new(status),
        }
    }

    pub fn with_namer(mut self, namer: ArtifactNamer) -> Self {
        self.namer = namer;
        self
    }

    /// Name of the container the blobs land in.
    pub fn container(&self) -> String {
        self.directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.directory.display().to_string())
    }

    fn blob_name(&self, artifact: &SinkArtifact) -> String {
        let name = self.namer.name(artifact);
        if self.compress {
            format!("{}.gz", name)
        } else {
            name
        }
    }

    fn write_blob(&self, artifact: &SinkArtifact) -> Result<StoredBlob, StageError> {
        let mut source = artifact.open()?;
        let staging = NamedTempFile::new_in(&self.directory)?;
        let hashing = HashingWriter::new(staging);

        self.status.set(PersistenceStatus::Compressing);
        let hashing = if self.compress {
            let mut encoder = GzEncoder::new(hashing, Compression::default());
            io::copy(&mut source, &mut encoder)?;
            encoder.finish()?
        } else {
            let mut hashing = hashing;
            io::copy(&mut source, &mut hashing)?;
            hashing
        };
        let (staging, checksum, size) = hashing.finish();

        self.status.set(PersistenceStatus::Uploading);
        let path = self.directory.join(self.blob_name(artifact));
        staging.persist(&path).map_err(|e| e.error)?;
        Ok(StoredBlob {
            path,
            checksum,
            size,
        })
    }

    fn write_sidecar(path: &Path, metadata: &Map<String, Value>) -> Result<(), StageError> {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(".meta.json");
        fs::write(PathBuf::from(sidecar), serde_json::to_vec_pretty(metadata)?)?;
        Ok(())
    }

    fn store(
        &self,
        artifact: &SinkArtifact,
        extra: &Map<String, Value>,
    ) -> Result<Map<String, Value>, StageError> {
        let started = Instant::now();
        let blob = self.write_blob(artifact)?;
        let upload_ms = started.elapsed().as_millis() as u64;

        let mut metadata = extra.clone();
        metadata.insert("container".to_string(), json!(self.container()));
        metadata.insert(
            "blob".to_string(),
            json!({
                "id": artifact.id,
                "specification": self.specification,
                "recordCount": artifact.record_count,
                "sizeBytes": blob.size,
                "checksum": blob.checksum,
                "uploadDuration": upload_ms,
                "url": format!("file://{}", blob.path.display()),
            }),
        );

        self.status.set(PersistenceStatus::CleaningUp);
        Self::write_sidecar(&blob.path, &metadata)?;
        debug!(
            job_id = %self.job_id,
            path = %blob.path.display(),
            size = blob.size,
            "Artifact archived"
        );
        Ok(metadata)
    }
}

impl PersistenceStage for ArchivePersister {
    fn backend(&self) -> BackendKind {
        BackendKind::Archive
    }

    fn status(&self) -> StatusCell {
        self.status.clone()
    }

    fn persist(&mut self, artifact: &SinkArtifact, extra: &Map<String, Value>) -> PersistenceResult {
        match self.store(artifact, extra) {
            Ok(metadata) => {
                self.status.set(PersistenceStatus::Success);
                PersistenceResult::succeeded(self.job_id, BackendKind::Archive, metadata)
            }
            Err(e) => {
                self.status.set(PersistenceStatus::Errored);
                PersistenceResult::failed(self.job_id, BackendKind::Archive, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpecificationKind;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn artifact(content: &str) -> SinkArtifact {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        file.write_all(content.as_bytes()).expect("temp file should be writable");
        SinkArtifact::new("csv", 3, file.into_temp_path())
    }

    fn persister(dir: &Path, compress: bool) -> ArchivePersister {
        let spec = SpecificationKind::Companies.specification();
        let mut config = JobConfig::new("Companies", 3);
        config.id = Some(Uuid::new_v4());
        ArchivePersister::new(
            &config,
            &BackendConfig::new(dir).with_compress(compress),
            &spec,
        )
    }

    fn blob_path(result: &PersistenceResult) -> PathBuf {
        let url = result.metadata["blob"]["url"]
            .as_str()
            .expect("url should be a string");
        PathBuf::from(url.trim_start_matches("file://"))
    }

    #[test]
    fn test_hashing_writer_digest() {
        let mut writer = HashingWriter::new(Vec::new());
        writer.write_all(b"abc").expect("write should succeed");
        let (inner, checksum, size) = writer.finish();

        assert_eq!(inner, b"abc");
        assert_eq!(size, 3);
        assert_eq!(
            checksum,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_compressed_blob_round_trips() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut persister = persister(dir.path(), true);

        let result = persister.persist(&artifact("name\nOak\nPine\n"), &Map::new());
        assert!(result.success, "{:?}", result.metadata);
        assert_eq!(persister.status().get(), PersistenceStatus::Success);

        let path = blob_path(&result);
        assert!(path.to_string_lossy().ends_with(".csv.gz"));
        let stored = fs::read(&path).expect("blob should exist");
        assert_eq!(
            result.metadata["blob"]["checksum"],
            hex::encode(Sha256::digest(&stored))
        );

        let mut content = String::new();
        GzDecoder::new(stored.as_slice())
            .read_to_string(&mut content)
            .expect("blob should decompress");
        assert_eq!(content, "name\nOak\nPine\n");

        let sidecar = format!("{}.meta.json", path.display());
        let meta: Value = serde_json::from_slice(&fs::read(sidecar).expect("sidecar should exist"))
            .expect("sidecar should be json");
        assert_eq!(meta["blob"]["recordCount"], 3);
        assert_eq!(meta["blob"]["specification"], "companies");
    }

    #[test]
    fn test_uncompressed_blob_is_a_copy() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut persister = persister(dir.path(), false);

        let result = persister.persist(&artifact("plain"), &Map::new());
        assert!(result.success);
        let path = blob_path(&result);
        assert!(path.to_string_lossy().ends_with(".csv"));
        assert_eq!(fs::read_to_string(path).expect("blob should exist"), "plain");
        assert_eq!(result.metadata["blob"]["sizeBytes"], 5);
    }

    #[test]
    fn test_container_is_directory_name() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let archive = dir.path().join("exports");
        fs::create_dir(&archive).expect("archive dir should be created");
        assert_eq!(persister(&archive, true).container(), "exports");
    }
}
