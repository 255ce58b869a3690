use thiserror::Error;

/// Error for principal cache backend operations
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache connection failed: {0}")]
    Connection(String),

    #[error("Cache command failed: {0}")]
    Command(String),

    #[error("Cache entry could not be (de)serialized: {0}")]
    Serialization(String),
}
