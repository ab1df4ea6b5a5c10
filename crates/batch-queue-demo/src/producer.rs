use std::time::{Duration, Instant};

use batch_queue::BatchSender;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct Event {
    pub producer: usize,
    pub seq: usize,
    pub created_at: Instant,
}

impl Event {
    pub fn new(producer: usize, seq: usize) -> Self {
        Self {
            producer,
            seq,
            created_at: Instant::now(),
        }
    }
}

/// Adds `items` events to the batcher, sleeping `delay` between them.
/// Returns the number of events that were accepted.
#[tracing::instrument(skip(sender))]
pub async fn produce(
    sender: BatchSender<Event>,
    producer: usize,
    items: usize,
    delay: Duration,
) -> usize {
    for seq in 0..items {
        if let Err(e) = sender.add(Event::new(producer, seq)).await {
            warn!(
                "Batcher closed, producer {} stopping at event {}",
                producer,
                e.into_inner().seq
            );
            return seq;
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    debug!("Producer {} done", producer);
    items
}
