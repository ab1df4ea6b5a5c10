//! A bounded batching queue.
//!
//! Producers add items one at a time, a background task groups them into
//! batches that are released when they are full or when the flush timeout of
//! the batch runs out, and a single consumer receives the batches in order.
//!
//! ```no_run
//! use std::time::Duration;
//! use batch_queue::{create_batcher, Culling};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut batcher = create_batcher::<u32>(10, Culling::None, Duration::from_secs(2))?;
//! let mut batches = batcher.batches().expect("consumer handle");
//!
//! for i in 0..10 {
//!     batcher.add(i).await?;
//! }
//! assert_eq!(batches.recv().await, Some((0..10).collect()));
//! # Ok(())
//! # }
//! ```
mod aggregator;
mod batcher;
pub mod config;
pub mod error;
mod handoff;
pub mod metrics;

pub use batcher::{create_batcher, BatchSender, Batcher, Batches};
pub use config::{BatcherConfig, BatcherConfigBuilder, CloseMode, Culling, MAX_BATCH_SIZE};
pub use error::{AddError, BatcherError, TryAddError};
pub use metrics::{BatchMetrics, FlushReason, NoopMetrics};
