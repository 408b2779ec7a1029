//! Sink stages: render records into artifacts.
//!
//! File-backed sinks share [`FileSink`], which owns a temporary file and
//! delegates record encoding to a [`RecordEncoder`]:
//!
//! - [`CsvEncoder`]: header of output names, one row per record
//! - [`JsonEncoder`]: a JSON array of objects keyed by field name
//! - [`TextEncoder`]: labelled plain-text blocks
//!
//! [`StreamSink`] publishes each record live and produces no artifact.
//!
//! # Example
//!
//! ```ignore
//! use recordforge::export::build_sinks;
//! use recordforge::pipeline::OutputFormat;
//!
//! let sinks = build_sinks(OutputFormat::Csv, &spec, &config, None)?;
//! ```

pub mod csv;
pub mod json;
pub mod stream;
pub mod text;

use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::StreamSettings;
use crate::error::{ConfigurationError, StageError};
use crate::model::{Record, SinkArtifact, Specification};
use crate::pipeline::config::STREAM_ID_KEY;
use crate::pipeline::{JobConfig, OutputFormat, SinkStage};

pub use self::csv::CsvEncoder;
pub use self::json::JsonEncoder;
pub use self::stream::StreamSink;
pub use self::text::TextEncoder;

/// Serializes records into a byte stream.
pub trait RecordEncoder: Send {
    /// Content kind, used as the artifact type and file extension.
    fn kind(&self) -> &'static str;

    fn begin<W: Write>(&mut self, out: &mut W, spec: &Specification) -> io::Result<()>;

    fn encode<W: Write>(
        &mut self,
        out: &mut W,
        spec: &Specification,
        record: &Record,
    ) -> Result<(), StageError>;

    fn end<W: Write>(&mut self, out: &mut W) -> io::Result<()>;
}

/// A sink writing encoded records to a temporary file.
pub struct FileSink<E: RecordEncoder> {
    encoder: E,
    specification: Arc<Specification>,
    writer: Option<BufWriter<NamedTempFile>>,
    records: u64,
}

impl<E: RecordEncoder> FileSink<E> {
    pub fn new(encoder: E, specification: Arc<Specification>) -> Self {
        Self {
            encoder,
            specification,
            writer: None,
            records: 0,
        }
    }

    fn open(&mut self) -> io::Result<()> {
        let file = tempfile::Builder::new()
            .prefix("recordforge-")
            .suffix(&format!(".{}", self.encoder.kind()))
            .tempfile()?;
        let mut writer = BufWriter::new(file);
        self.encoder.begin(&mut writer, &self.specification)?;
        self.writer = Some(writer);
        Ok(())
    }
}

impl<E: RecordEncoder> SinkStage for FileSink<E> {
    fn name(&self) -> &'static str {
        self.encoder.kind()
    }

    fn prepare(&mut self) -> bool {
        match self.open() {
            Ok(()) => true,
            Err(e) => {
                warn!(sink = self.encoder.kind(), error = %e, "Failed to open sink output");
                false
            }
        }
    }

    fn sink(&mut self, record: &Record) -> bool {
        let Some(writer) = self.writer.as_mut() else {
            return false;
        };
        match self.encoder.encode(writer, &self.specification, record) {
            Ok(()) => {
                self.records += 1;
                true
            }
            Err(e) => {
                warn!(
                    sink = self.encoder.kind(),
                    sequence = record.sequence,
                    error = %e,
                    "Failed to write record"
                );
                false
            }
        }
    }

    fn finish(&mut self) -> Result<Option<SinkArtifact>, StageError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(None);
        };
        self.encoder.end(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        debug!(
            sink = self.encoder.kind(),
            records = self.records,
            path = %file.path().display(),
            "Sink finished"
        );
        Ok(Some(SinkArtifact::new(
            self.encoder.kind(),
            self.records,
            file.into_temp_path(),
        )))
    }
}

/// Builds the sinks for an output format.
///
/// The stream format emits twice: live to the stream, and to a CSV artifact
/// that can be persisted.
pub fn build_sinks(
    format: OutputFormat,
    specification: &Arc<Specification>,
    config: &JobConfig,
    stream: Option<&StreamSettings>,
) -> Result<Vec<Box<dyn SinkStage>>, ConfigurationError> {
    let csv = || -> Box<dyn SinkStage> {
        Box::new(FileSink::new(CsvEncoder::new(), specification.clone()))
    };
    let sinks = match format {
        OutputFormat::Csv => vec![csv()],
        OutputFormat::Json => vec![Box::new(FileSink::new(
            JsonEncoder::new(),
            specification.clone(),
        )) as Box<dyn SinkStage>],
        OutputFormat::Txt => vec![Box::new(FileSink::new(
            TextEncoder::new(),
            specification.clone(),
        )) as Box<dyn SinkStage>],
        OutputFormat::Stream => {
            let stream_id = config
                .extra
                .get(STREAM_ID_KEY)
                .filter(|id| !id.trim().is_empty())
                .ok_or_else(|| ConfigurationError::MissingStreamParameter(STREAM_ID_KEY.to_string()))?;
            let settings = stream.ok_or_else(|| {
                ConfigurationError::MissingStreamParameter("stream connection url".to_string())
            })?;
            vec![
                Box::new(StreamSink::new(
                    settings.url.clone(),
                    stream_id.clone(),
                    specification.clone(),
                )) as Box<dyn SinkStage>,
                csv(),
            ]
        }
    };
    Ok(sinks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldValue, SpecificationKind};
    use std::io::Read;

    fn names() -> Arc<Specification> {
        Arc::new(SpecificationKind::Names.specification())
    }

    fn record(sequence: u64) -> Record {
        Record::new(
            sequence,
            vec![
                FieldValue::Text("Ada".to_string()),
                FieldValue::Text("B".to_string()),
                FieldValue::Text("Lovelace".to_string()),
            ],
        )
    }

    #[test]
    fn test_file_sink_produces_artifact() {
        let mut sink = FileSink::new(CsvEncoder::new(), names());
        assert!(sink.prepare());
        assert!(sink.sink(&record(0)));
        assert!(sink.sink(&record(1)));

        let artifact = sink
            .finish()
            .expect("finish should succeed")
            .expect("csv sink should produce an artifact");
        assert_eq!(artifact.kind, "csv");
        assert_eq!(artifact.record_count, 2);

        let mut content = String::new();
        artifact
            .open()
            .expect("artifact should open")
            .read_to_string(&mut content)
            .expect("artifact should read");
        assert_eq!(content.lines().count(), 3);
        artifact.cleanup().expect("cleanup should succeed");
    }

    #[test]
    fn test_unprepared_sink_rejects_records() {
        let mut sink = FileSink::new(JsonEncoder::new(), names());
        assert!(!sink.sink(&record(0)));
        assert!(sink.finish().expect("finish should succeed").is_none());
    }

    #[test]
    fn test_stream_requires_stream_id() {
        let config = JobConfig::new("Names", 1).with_output_format("stream");
        let settings = StreamSettings::new("redis://localhost:6379");

        let result = build_sinks(OutputFormat::Stream, &names(), &config, Some(&settings));
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingStreamParameter(_))
        ));
    }

    #[test]
    fn test_stream_pairs_with_csv() {
        let config = JobConfig::new("Names", 1).with_extra(STREAM_ID_KEY, "names-feed");
        let settings = StreamSettings::new("redis://localhost:6379");

        let sinks = build_sinks(OutputFormat::Stream, &names(), &config, Some(&settings))
            .expect("stream sinks should build");
        let kinds: Vec<_> = sinks.iter().map(|s| s.name()).collect();
        assert_eq!(kinds, vec!["stream", "csv"]);
    }
}
