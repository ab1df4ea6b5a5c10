mod config;
mod metrics;
mod producer;
mod sinks;
mod telemetry;

extern crate dotenv;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use batch_queue::{Batcher, Batches};
use tokio::sync::oneshot::{self, Sender};
use tracing::info;

use crate::{
    config::Configuration,
    metrics::setup_metrics,
    producer::{produce, Event},
    sinks::{
        log::LogSink,
        sink::{Sink, SinkError},
        stats::StatsSink,
    },
    telemetry::{setup_telemetry, teardown_telemetry},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Configuration::from_env()?;
    setup_telemetry(&config.telemetry).map_err(|e| anyhow::anyhow!("Telemetry setup: {e}"))?;
    info!("Chosen configuration: {:#?}", config);

    let signal_flag = setup_signal_handlers()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    setup_shutdown_handler(signal_flag, shutdown_tx);

    let metrics = setup_metrics(config.metrics_port)?;
    let mut batcher = Batcher::with_metrics(config.batcher.clone(), metrics)?;
    let batches = batcher
        .batches()
        .context("Batch consumer handle was already taken")?;

    let consumer = tokio::spawn(consume(batches, setup_sinks()));

    let producers = futures::future::join_all((0..config.producers).map(|producer| {
        tokio::spawn(produce(
            batcher.sender(),
            producer,
            config.items_per_producer,
            config.producer_delay,
        ))
    }));

    tokio::select! {
        results = producers => {
            let produced: usize = results.into_iter().filter_map(Result::ok).sum();
            info!("Producers added {} items", produced);
        },
        _ = shutdown_rx => info!("Shutdown signal detected. Shutting down gracefully."),
    };

    batcher.shutdown().await?;

    let mut sinks = consumer
        .await?
        .map_err(|e| anyhow::anyhow!("Consuming batches: {e}"))?;

    info!("Flushing sinks");
    for sink in sinks.iter_mut() {
        sink.flush()
            .await
            .map_err(|e| anyhow::anyhow!("Flushing sink: {e}"))?;
    }

    info!("Tearing down...");
    teardown_telemetry();
    info!("Shutting down");

    Ok(())
}

type BoxedSink = Box<dyn Sink + Send>;

fn setup_sinks() -> Vec<BoxedSink> {
    vec![Box::new(LogSink), Box::new(StatsSink::new())]
}

/// Fans every batch out to all sinks until the batcher stops.
async fn consume(
    mut batches: Batches<Event>,
    mut sinks: Vec<BoxedSink>,
) -> Result<Vec<BoxedSink>, SinkError> {
    while let Some(batch) = batches.recv().await {
        for sink in sinks.iter_mut() {
            sink.handle(&batch).await?;
        }
    }

    info!("Batch stream ended");
    Ok(sinks)
}

fn setup_shutdown_handler(signal_flag: Arc<AtomicBool>, shutdown_tx: Sender<()>) {
    std::thread::spawn(move || loop {
        if !signal_flag.load(Ordering::Relaxed) {
            std::thread::sleep(std::time::Duration::from_secs(1));
            continue;
        }

        if shutdown_tx.send(()).is_err() {
            tracing::debug!("Main task finished before the shutdown signal arrived");
        }
        break;
    });
}

fn setup_signal_handlers() -> anyhow::Result<Arc<AtomicBool>> {
    let signal_flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, signal_flag.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, signal_flag.clone())?;
    Ok(signal_flag)
}
