/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure of a stored record.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backend-specific failure (database error, poisoned lock, ...).
    #[error("backend error: {0}")]
    Backend(String),

    /// A stored key could not be decoded into a height.
    #[error("corrupt key: expected 8 bytes, got {len}")]
    CorruptKey { len: usize },

    /// A log frame before the end of the file failed its checks.
    #[error("corrupt log frame at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// The store has been closed and no longer accepts operations.
    #[error("store is closed")]
    Closed,
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        match e {
            sled::Error::Io(io) => Self::Io(io),
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
