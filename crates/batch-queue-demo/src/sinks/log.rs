use async_trait::async_trait;
use tracing::info;

use crate::producer::Event;

use super::sink::{Sink, SinkError};

/// Logs every batch it receives.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl Sink for LogSink {
    #[tracing::instrument(skip(self, batch), name = "sink-handle-log")]
    async fn handle(&mut self, batch: &[Event]) -> Result<usize, SinkError> {
        let oldest = batch
            .iter()
            .map(|event| event.created_at.elapsed())
            .max()
            .unwrap_or_default();

        info!(
            "---> {} elements (oldest waited {}ms)",
            batch.len(),
            oldest.as_millis()
        );
        Ok(batch.len())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
