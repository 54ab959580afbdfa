use thiserror::Error;

/// Error type shared by the sampler, the analyses and the report drivers.
/// Every variant except `NoData` aborts the running report.
#[derive(Debug, Error)]
pub enum StatError {
    #[error("Sorry but DB 0 is empty")]
    EmptyDataset,

    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("No valid samples found: collected {collected}, discarded {discarded} draws")]
    SamplingExhausted { collected: usize, discarded: usize },

    #[error("No data to display")]
    NoData,

    #[error("Redis instance has VM disabled?")]
    VmDisabled,

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl StatError {
    /// True for the errors that end the whole process run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, StatError::NoData)
    }
}
