use std::{str::FromStr, time::Duration};

use anyhow::Context;
use batch_queue::{BatcherConfig, CloseMode, Culling};

#[derive(Debug, Clone)]
pub struct Configuration {
    pub batcher: BatcherConfig,
    pub producers: usize,
    pub items_per_producer: usize,
    pub producer_delay: Duration,
    pub metrics_port: u32,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub environment: String,
    /// Traces are only exported when an OTLP collector is configured.
    pub otlp_endpoint: Option<String>,
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl TelemetryConfig {
    pub fn from_env(service_name: &str) -> TelemetryConfig {
        TelemetryConfig {
            service_name: service_name.to_string(),
            environment: read_string_from_env("ENV").unwrap_or("development".into()),
            otlp_endpoint: read_string_from_env("OTLP_ENDPOINT"),
            default_filter: read_string_from_env("LOG_FILTER")
                .unwrap_or("info,batch_queue=debug".into()),
        }
    }
}

impl Configuration {
    pub fn from_env() -> anyhow::Result<Configuration> {
        let batcher = BatcherConfig::builder()
            .with_max_batch_size(read_from_env("BATCH_MAX_SIZE")?.unwrap_or(10))
            .with_flush_timeout(Duration::from_millis(
                read_from_env("BATCH_FLUSH_TIMEOUT_MS")?.unwrap_or(2000),
            ))
            .with_culling(read_from_env::<Culling>("BATCH_CULLING")?.unwrap_or_default())
            .with_close_mode(read_from_env::<CloseMode>("BATCH_CLOSE_MODE")?.unwrap_or_default())
            .build();
        batcher.validate()?;

        Ok(Configuration {
            batcher,
            producers: read_from_env("DEMO_PRODUCERS")?.unwrap_or(2),
            items_per_producer: read_from_env("DEMO_ITEMS_PER_PRODUCER")?.unwrap_or(25),
            producer_delay: Duration::from_millis(
                read_from_env("DEMO_PRODUCER_DELAY_MS")?.unwrap_or(0),
            ),
            metrics_port: read_from_env("METRICS_PORT")?.unwrap_or(4000),
            telemetry: TelemetryConfig::from_env("batch-queue-demo"),
        })
    }
}

pub fn read_string_from_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

/// Reads and parses an optional environment variable. Present but unparsable
/// values are an error rather than silently falling back to the default.
pub fn read_from_env<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    read_string_from_env(name)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value {:?} for {}", value, name))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use batch_queue::{CloseMode, Culling};

    use super::{read_from_env, TelemetryConfig};

    #[test]
    fn test_read_from_env() {
        std::env::set_var("BATCH_QUEUE_DEMO_TEST_INT", "42");
        std::env::set_var("BATCH_QUEUE_DEMO_TEST_CULLING", "Last");
        std::env::set_var("BATCH_QUEUE_DEMO_TEST_CLOSE_MODE", "discard");
        std::env::set_var("BATCH_QUEUE_DEMO_TEST_BROKEN", "forty-two");

        assert_eq!(
            read_from_env::<u32>("BATCH_QUEUE_DEMO_TEST_INT").unwrap(),
            Some(42)
        );
        assert_eq!(
            read_from_env::<Culling>("BATCH_QUEUE_DEMO_TEST_CULLING").unwrap(),
            Some(Culling::Last)
        );
        assert_eq!(
            read_from_env::<CloseMode>("BATCH_QUEUE_DEMO_TEST_CLOSE_MODE").unwrap(),
            Some(CloseMode::Discard)
        );
        assert!(read_from_env::<u32>("BATCH_QUEUE_DEMO_TEST_BROKEN").is_err());
        assert_eq!(
            read_from_env::<u32>("BATCH_QUEUE_DEMO_TEST_MISSING").unwrap(),
            None
        );
    }

    #[test]
    fn test_telemetry_config_defaults() {
        std::env::remove_var("OTLP_ENDPOINT");
        std::env::remove_var("LOG_FILTER");

        let telemetry = TelemetryConfig::from_env("batch-queue-demo");
        assert_eq!(telemetry.service_name, "batch-queue-demo");
        assert_eq!(telemetry.otlp_endpoint, None);
        assert_eq!(telemetry.default_filter, "info,batch_queue=debug");
    }
}
