use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures::Stream;
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot,
    },
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{
    aggregator::Aggregator,
    config::{BatcherConfig, Culling},
    error::{AddError, BatcherError, TryAddError},
    handoff::{self, HandoffReceiver},
    metrics::{BatchMetrics, NoopMetrics},
};

/// Creates a batcher with the given limits and the default close mode.
///
/// Must be called from within a tokio runtime, the aggregation loop is spawned
/// onto it right away.
pub fn create_batcher<T: Send + 'static>(
    max_size: usize,
    culling: Culling,
    flush_timeout: Duration,
) -> Result<Batcher<T>, BatcherError> {
    Batcher::new(BatcherConfig::new(max_size, culling, flush_timeout))
}

/// A bounded batching queue.
///
/// Items added through [`Batcher::add`] or a [`BatchSender`] are grouped into
/// batches of at most `max_batch_size` items. A batch is handed to the consumer
/// once it is full or once `flush_timeout` has passed since its first item
/// arrived, whichever happens first.
///
/// # Lifecycle
/// 1. Create with [`Batcher::new`], which spawns the aggregation task
/// 2. Take the consumer handle once with [`Batcher::batches`]
/// 3. Add items from any number of producers
/// 4. Stop with [`Batcher::shutdown`]
///
/// Dropping the batcher closes the intake as well, but does not wait for the
/// aggregation task to finish.
pub struct Batcher<T> {
    sender: BatchSender<T>,
    batches: Option<Batches<T>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    worker: JoinHandle<()>,
    config: BatcherConfig,
}

impl<T: Send + 'static> Batcher<T> {
    pub fn new(config: BatcherConfig) -> Result<Self, BatcherError> {
        Self::with_metrics(config, NoopMetrics)
    }

    pub fn with_metrics<M>(config: BatcherConfig, metrics: M) -> Result<Self, BatcherError>
    where
        M: BatchMetrics + Send + 'static,
    {
        config.validate()?;

        if config.culling != Culling::None {
            warn!(
                "Culling policy '{}' is reserved and has no effect, no items will be culled",
                config.culling
            );
        }

        let (intake_tx, intake_rx) = mpsc::channel(config.max_batch_size);
        let (output_tx, output_rx) = handoff::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let aggregator = Aggregator::new(
            intake_rx,
            output_tx,
            shutdown_rx,
            config.clone(),
            metrics,
        );
        let worker = tokio::spawn(aggregator.run());

        info!(
            "Started batcher (max batch size {}, flush timeout {:?})",
            config.max_batch_size, config.flush_timeout
        );

        Ok(Self {
            sender: BatchSender { tx: intake_tx },
            batches: Some(Batches { rx: output_rx }),
            shutdown_tx: Some(shutdown_tx),
            worker,
            config,
        })
    }

    /// Adds an item, waiting while the intake queue is full.
    pub async fn add(&self, item: T) -> Result<(), AddError<T>> {
        self.sender.add(item).await
    }

    /// Returns a producer handle that can be cloned and moved to other tasks.
    pub fn sender(&self) -> BatchSender<T> {
        self.sender.clone()
    }

    /// Hands out the consumer side. There is exactly one; later calls return
    /// `None`.
    pub fn batches(&mut self) -> Option<Batches<T>> {
        self.batches.take()
    }

    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    /// Closes the intake and waits for the aggregation task to finish.
    ///
    /// Items that are already queued are still batched. With
    /// [`CloseMode::Flush`](crate::CloseMode::Flush) the last partial batch is
    /// handed off too, so a consumer has to keep receiving for this to return.
    pub async fn shutdown(mut self) -> Result<(), BatcherError> {
        info!("Shutting down batcher");
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            // The task may already be gone if the consumer was dropped.
            let _ = shutdown_tx.send(());
        }

        let Batcher {
            sender,
            batches,
            worker,
            ..
        } = self;
        drop(sender);
        drop(batches);
        worker.await?;

        info!("Batcher shut down");
        Ok(())
    }
}

/// Producer handle for a [`Batcher`].
pub struct BatchSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for BatchSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> BatchSender<T> {
    /// Adds an item, waiting while the intake queue is full.
    pub async fn add(&self, item: T) -> Result<(), AddError<T>> {
        self.tx.send(item).await.map_err(|e| AddError(e.0))
    }

    /// Blocking variant of [`BatchSender::add`] for producers outside the
    /// async runtime. Panics when called from within an async context.
    pub fn blocking_add(&self, item: T) -> Result<(), AddError<T>> {
        self.tx.blocking_send(item).map_err(|e| AddError(e.0))
    }

    /// Adds an item only if the intake queue has room right now.
    pub fn try_add(&self, item: T) -> Result<(), TryAddError<T>> {
        self.tx.try_send(item).map_err(|e| match e {
            TrySendError::Full(item) => TryAddError::Full(item),
            TrySendError::Closed(item) => TryAddError::Closed(item),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer handle for a [`Batcher`].
///
/// Yields batches in the order they were assembled and `None` once the
/// aggregation task has stopped.
pub struct Batches<T> {
    rx: HandoffReceiver<Vec<T>>,
}

impl<T> Batches<T> {
    pub async fn recv(&mut self) -> Option<Vec<T>> {
        self.rx.recv().await
    }

    /// Blocking variant of [`Batches::recv`]. Panics when called from within an
    /// async context.
    pub fn blocking_recv(&mut self) -> Option<Vec<T>> {
        self.rx.blocking_recv()
    }
}

impl<T> Stream for Batches<T> {
    type Item = Vec<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
