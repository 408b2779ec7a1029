//! Live stream sink.
//!
//! Publishes every record as a JSON object on a Redis channel named by the
//! job's `streamId`. Delivery is best effort; the sink produces no artifact.

use std::sync::Arc;

use redis::Commands;
use tracing::{info, warn};

use crate::error::StageError;
use crate::model::{Record, SinkArtifact, Specification};
use crate::pipeline::SinkStage;

pub struct StreamSink {
    url: String,
    channel: String,
    specification: Arc<Specification>,
    connection: Option<redis::Connection>,
    published: u64,
}

impl StreamSink {
    pub fn new(url: String, channel: String, specification: Arc<Specification>) -> Self {
        Self {
            url,
            channel,
            specification,
            connection: None,
            published: 0,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    fn connect(&self) -> Result<redis::Connection, StageError> {
        let client = redis::Client::open(self.url.as_str())?;
        Ok(client.get_connection()?)
    }

    fn publish(&mut self, record: &Record) -> Result<(), StageError> {
        let connection = self.connection.as_mut().ok_or(StageError::NotPrepared)?;
        let payload = serde_json::to_string(&record.view(&self.specification))?;
        let _receivers: i64 = connection.publish(&self.channel, payload)?;
        self.published += 1;
        Ok(())
    }
}

impl SinkStage for StreamSink {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn prepare(&mut self) -> bool {
        match self.connect() {
            Ok(connection) => {
                self.connection = Some(connection);
                true
            }
            Err(e) => {
                warn!(channel = %self.channel, error = %e, "Failed to connect stream sink");
                false
            }
        }
    }

    fn sink(&mut self, record: &Record) -> bool {
        match self.publish(record) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    channel = %self.channel,
                    sequence = record.sequence,
                    error = %e,
                    "Failed to publish record"
                );
                false
            }
        }
    }

    fn finish(&mut self) -> Result<Option<SinkArtifact>, StageError> {
        if self.connection.take().is_some() {
            info!(
                channel = %self.channel,
                published = self.published,
                "Stream sink finished"
            );
        }
        Ok(None)
    }
}
