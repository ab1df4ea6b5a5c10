use batch_queue::{BatchMetrics, FlushReason};
use prometheus_exporter::prometheus::{
    core::{AtomicU64, GenericCounter},
    register_int_counter,
};

#[derive(Clone, Debug)]
pub struct BatcherMetricStore {
    batches_flushed_size: GenericCounter<AtomicU64>,
    batches_flushed_timeout: GenericCounter<AtomicU64>,
    batches_flushed_close: GenericCounter<AtomicU64>,
    items_emitted: GenericCounter<AtomicU64>,
    items_discarded: GenericCounter<AtomicU64>,
}

impl BatchMetrics for BatcherMetricStore {
    fn inc_batches_emitted(&mut self, reason: FlushReason) {
        match reason {
            FlushReason::Size => self.batches_flushed_size.inc(),
            FlushReason::Timeout => self.batches_flushed_timeout.inc(),
            FlushReason::Close => self.batches_flushed_close.inc(),
        }
    }

    fn inc_items_emitted(&mut self, value: u64) {
        self.items_emitted.inc_by(value)
    }

    fn inc_items_discarded(&mut self, value: u64) {
        self.items_discarded.inc_by(value)
    }
}

impl BatcherMetricStore {
    pub fn new() -> Result<Self, prometheus_exporter::prometheus::Error> {
        Ok(BatcherMetricStore {
            batches_flushed_size: register_int_counter!(
                "batches_flushed_size",
                "Batches released because they reached the maximum batch size"
            )?,
            batches_flushed_timeout: register_int_counter!(
                "batches_flushed_timeout",
                "Batches released because their flush timeout elapsed"
            )?,
            batches_flushed_close: register_int_counter!(
                "batches_flushed_close",
                "Partial batches released while shutting down"
            )?,
            items_emitted: register_int_counter!(
                "items_emitted",
                "Items handed to the batch consumer"
            )?,
            items_discarded: register_int_counter!(
                "items_discarded",
                "Items dropped on shutdown or because the consumer went away"
            )?,
        })
    }
}

pub fn setup_metrics(port: u32) -> anyhow::Result<BatcherMetricStore> {
    let binding: std::net::SocketAddr = format!("0.0.0.0:{port}").parse()?;
    prometheus_exporter::start(binding)
        .map_err(|e| anyhow::anyhow!("Starting metrics exporter on {binding}: {e}"))?;

    BatcherMetricStore::new().map_err(|e| anyhow::anyhow!("Registering metrics: {e}"))
}
