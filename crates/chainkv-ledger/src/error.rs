use chainkv_store::StoreError;

/// Errors produced by ledger operations.
///
/// Integrity violations are not errors: validation reports them as results.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("no block at height {height}")]
    NotFound { height: u64 },

    #[error("store failure: {0}")]
    StoreFailure(#[from] StoreError),

    #[error("cannot decode block at height {height}: {reason}")]
    Decode { height: u64, reason: String },

    #[error("cannot encode block: {0}")]
    Encode(String),
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
