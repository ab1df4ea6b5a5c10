use std::fmt::Display;

/// Why the aggregation loop stopped collecting a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushReason {
    /// The batch reached `max_batch_size`.
    Size,
    /// The flush timeout elapsed before the batch filled up.
    Timeout,
    /// The intake was closed and drained while the batch was being assembled.
    Close,
}

impl FlushReason {
    pub fn to_str(&self) -> &'static str {
        match self {
            FlushReason::Size => "size",
            FlushReason::Timeout => "timeout",
            FlushReason::Close => "close",
        }
    }
}

impl Display for FlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Counters reported by the aggregation loop.
///
/// The loop owns its metrics instance, so implementations only need `&mut self`.
pub trait BatchMetrics {
    fn inc_batches_emitted(&mut self, reason: FlushReason);
    fn inc_items_emitted(&mut self, value: u64);
    fn inc_items_discarded(&mut self, value: u64);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl BatchMetrics for NoopMetrics {
    fn inc_batches_emitted(&mut self, _reason: FlushReason) {}

    fn inc_items_emitted(&mut self, _value: u64) {}

    fn inc_items_discarded(&mut self, _value: u64) {}
}
