use std::{fmt::Display, str::FromStr, time::Duration};

use crate::error::BatcherError;

/// Largest accepted `max_batch_size`, bounded by what a tokio channel can hold.
pub const MAX_BATCH_SIZE: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Overflow handling strategy.
///
/// Only `None` has behaviour attached to it. `First` and `Last` are reserved:
/// they are accepted so callers can pass them through, but no item is ever
/// culled since `add` applies backpressure instead of overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Culling {
    #[default]
    None,
    First,
    Last,
}

impl FromStr for Culling {
    type Err = BatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Culling::None),
            "first" => Ok(Culling::First),
            "last" => Ok(Culling::Last),
            _ => Err(BatcherError::InvalidSetting {
                name: "culling",
                value: s.to_string(),
            }),
        }
    }
}

impl Display for Culling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Culling::None => "none",
            Culling::First => "first",
            Culling::Last => "last",
        })
    }
}

/// What happens to a partially assembled batch once the intake is closed and
/// drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseMode {
    /// Emit the partial batch before stopping.
    #[default]
    Flush,
    /// Drop the partial batch.
    Discard,
}

impl FromStr for CloseMode {
    type Err = BatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flush" => Ok(CloseMode::Flush),
            "discard" => Ok(CloseMode::Discard),
            _ => Err(BatcherError::InvalidSetting {
                name: "close_mode",
                value: s.to_string(),
            }),
        }
    }
}

impl Display for CloseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CloseMode::Flush => "flush",
            CloseMode::Discard => "discard",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatcherConfig {
    /// Upper bound for a batch. Also the capacity of the intake queue.
    pub max_batch_size: usize,
    /// How long a batch may wait for more items after its first item arrived.
    pub flush_timeout: Duration,
    pub culling: Culling,
    pub close_mode: CloseMode,
}

impl BatcherConfig {
    pub fn new(max_batch_size: usize, culling: Culling, flush_timeout: Duration) -> Self {
        Self {
            max_batch_size,
            flush_timeout,
            culling,
            close_mode: CloseMode::default(),
        }
    }

    pub fn builder() -> BatcherConfigBuilder {
        BatcherConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<(), BatcherError> {
        if self.max_batch_size == 0 {
            return Err(BatcherError::ZeroBatchSize);
        }
        if self.max_batch_size > MAX_BATCH_SIZE {
            return Err(BatcherError::BatchSizeTooLarge {
                max_batch_size: self.max_batch_size,
                limit: MAX_BATCH_SIZE,
            });
        }
        Ok(())
    }
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            flush_timeout: Duration::from_secs(1),
            culling: Culling::None,
            close_mode: CloseMode::Flush,
        }
    }
}

#[derive(Default)]
pub struct BatcherConfigBuilder {
    configuration: BatcherConfig,
}

impl BatcherConfigBuilder {
    pub fn new() -> Self {
        BatcherConfigBuilder::default()
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.configuration.max_batch_size = max_batch_size;
        self
    }

    pub fn with_flush_timeout(mut self, flush_timeout: Duration) -> Self {
        self.configuration.flush_timeout = flush_timeout;
        self
    }

    pub fn with_culling(mut self, culling: Culling) -> Self {
        self.configuration.culling = culling;
        self
    }

    pub fn with_close_mode(mut self, close_mode: CloseMode) -> Self {
        self.configuration.close_mode = close_mode;
        self
    }

    pub fn build(self) -> BatcherConfig {
        self.configuration
    }
}
