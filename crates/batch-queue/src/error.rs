use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatcherError {
    #[error("max batch size must be at least 1")]
    ZeroBatchSize,
    #[error("max batch size {max_batch_size} exceeds the limit of {limit}")]
    BatchSizeTooLarge { max_batch_size: usize, limit: usize },
    #[error("invalid value {value:?} for {name}")]
    InvalidSetting { name: &'static str, value: String },
    #[error("aggregation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Returned by `add` once the batcher has shut down. Hands the item back.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("batcher is closed")]
pub struct AddError<T>(pub T);

impl<T> AddError<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TryAddError<T> {
    #[error("intake queue is full")]
    Full(T),
    #[error("batcher is closed")]
    Closed(T),
}

impl<T> TryAddError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TryAddError::Full(item) | TryAddError::Closed(item) => item,
        }
    }
}
