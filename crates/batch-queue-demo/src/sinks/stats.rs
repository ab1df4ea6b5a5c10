use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::info;

use crate::producer::Event;

use super::sink::{Sink, SinkError};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub batches: usize,
    pub items: usize,
    pub smallest_batch: Option<usize>,
    pub largest_batch: Option<usize>,
    pub items_per_producer: BTreeMap<usize, usize>,
}

/// Tallies what went through the batcher and reports it on flush.
#[derive(Debug, Default)]
pub struct StatsSink {
    summary: Summary,
}

impl StatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}

#[async_trait]
impl Sink for StatsSink {
    #[tracing::instrument(skip(self, batch), name = "sink-handle-stats")]
    async fn handle(&mut self, batch: &[Event]) -> Result<usize, SinkError> {
        let summary = &mut self.summary;
        summary.batches += 1;
        summary.items += batch.len();
        summary.smallest_batch = summary
            .smallest_batch
            .min(Some(batch.len()))
            .or(Some(batch.len()));
        summary.largest_batch = summary.largest_batch.max(Some(batch.len()));

        for event in batch {
            *summary.items_per_producer.entry(event.producer).or_default() += 1;
        }

        Ok(batch.len())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        info!(
            "Received {} items in {} batches (smallest {:?}, largest {:?})",
            self.summary.items,
            self.summary.batches,
            self.summary.smallest_batch,
            self.summary.largest_batch
        );
        for (producer, items) in &self.summary.items_per_producer {
            info!("Producer {}: {} items", producer, items);
        }
        Ok(())
    }
}
