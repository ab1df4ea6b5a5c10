use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::{
    config::{BatcherConfig, CloseMode},
    handoff::HandoffSender,
    metrics::{BatchMetrics, FlushReason},
};

/// Upper bound for the up-front allocation of a batch. Larger batches grow.
const INITIAL_BATCH_CAPACITY: usize = 1024;

/// The single reader of the intake queue and the single writer of the output
/// channel.
pub(crate) struct Aggregator<T, M> {
    intake: mpsc::Receiver<T>,
    output: HandoffSender<Vec<T>>,
    shutdown: oneshot::Receiver<()>,
    config: BatcherConfig,
    metrics: M,
    /// Set once the intake has been closed. Buffered items are still drained.
    closing: bool,
}

impl<T, M> Aggregator<T, M>
where
    T: Send + 'static,
    M: BatchMetrics + Send + 'static,
{
    pub(crate) fn new(
        intake: mpsc::Receiver<T>,
        output: HandoffSender<Vec<T>>,
        shutdown: oneshot::Receiver<()>,
        config: BatcherConfig,
        metrics: M,
    ) -> Self {
        Self {
            intake,
            output,
            shutdown,
            config,
            metrics,
            closing: false,
        }
    }

    #[tracing::instrument(
        name = "aggregator",
        skip(self),
        fields(
            max_batch_size = self.config.max_batch_size,
            flush_timeout_ms = self.config.flush_timeout.as_millis() as u64,
            close_mode = %self.config.close_mode,
        )
    )]
    pub(crate) async fn run(mut self) {
        info!("Aggregation loop started");

        while let Some(first) = self.next_first_item().await {
            let (batch, reason) = self.collect(first).await;

            if reason == FlushReason::Close && self.config.close_mode == CloseMode::Discard {
                warn!("Discarding partial batch of {} items on close", batch.len());
                self.metrics.inc_items_discarded(batch.len() as u64);
                break;
            }

            if !self.emit(batch, reason).await || reason == FlushReason::Close {
                break;
            }
        }

        info!("Aggregation loop stopped");
    }

    /// Waits without a deadline for the item that opens the next batch.
    /// `None` means the intake is closed and drained.
    async fn next_first_item(&mut self) -> Option<T> {
        loop {
            tokio::select! {
                biased;
                _ = &mut self.shutdown, if !self.closing => self.close_intake(),
                item = self.intake.recv() => {
                    if item.is_some() {
                        trace!("Received first item of batch");
                    }
                    return item;
                }
            }
        }
    }

    /// Fills a batch until it is full, the flush timer fires or the intake
    /// runs dry after closing.
    async fn collect(&mut self, first: T) -> (Vec<T>, FlushReason) {
        let max_batch_size = self.config.max_batch_size;
        let deadline = tokio::time::sleep(self.config.flush_timeout);
        tokio::pin!(deadline);

        let mut batch = Vec::with_capacity(max_batch_size.min(INITIAL_BATCH_CAPACITY));
        batch.push(first);

        while batch.len() < max_batch_size {
            tokio::select! {
                biased;
                _ = &mut self.shutdown, if !self.closing => self.close_intake(),
                item = self.intake.recv() => match item {
                    Some(item) => {
                        trace!(batch_len = batch.len() + 1, "Received item");
                        batch.push(item);
                    }
                    None => return (batch, FlushReason::Close),
                },
                _ = &mut deadline => return (batch, FlushReason::Timeout),
            }
        }

        (batch, FlushReason::Size)
    }

    /// Hands the batch to the consumer. Returns `false` if the consumer is gone.
    async fn emit(&mut self, batch: Vec<T>, reason: FlushReason) -> bool {
        let len = batch.len() as u64;
        debug!(batch_len = len, %reason, "Emitting batch");

        match self.output.send(batch).await {
            Ok(()) => {
                self.metrics.inc_batches_emitted(reason);
                self.metrics.inc_items_emitted(len);
                true
            }
            Err(_) => {
                warn!("Batch consumer went away, dropping batch of {} items", len);
                self.metrics.inc_items_discarded(len);
                false
            }
        }
    }

    /// Stops accepting new items. Items already queued are still received.
    fn close_intake(&mut self) {
        debug!("Closing intake");
        self.closing = true;
        self.intake.close();
    }
}
