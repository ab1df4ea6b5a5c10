use async_trait::async_trait;

use crate::producer::Event;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait Sink {
    /// Handles one batch released by the batcher.
    async fn handle(&mut self, batch: &[Event]) -> Result<usize, SinkError>;

    /// Sinks can be stateful and so want to be flushed upon graceful shutdown.
    async fn flush(&mut self) -> Result<(), SinkError>;
}
