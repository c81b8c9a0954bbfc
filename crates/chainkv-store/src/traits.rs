use async_trait::async_trait;

use crate::error::StoreResult;

/// One `(key, value)` pair yielded by a scan.
pub type Entry = (u64, Vec<u8>);

/// Lazy, ordered, finite sequence of store entries.
///
/// Produced fresh by every [`KvStore::scan`] call. Entries arrive in ascending
/// key order and the iterator ends after the last entry present when the scan
/// started (backends may or may not observe concurrent writes).
pub type Scan = Box<dyn Iterator<Item = StoreResult<Entry>> + Send>;

/// Ordered, durable key-value store keyed by block height.
///
/// All implementations must satisfy these invariants:
/// - `put` is an upsert: writing an existing key replaces its value.
/// - `scan` yields keys in ascending numeric order.
/// - The store never interprets values; it is a pure key-value store.
/// - All I/O errors are propagated, never silently ignored.
/// - After `close`, every operation fails with `StoreError::Closed`.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Durably write `value` under `key`, replacing any previous value.
    async fn put(&self, key: u64, value: Vec<u8>) -> StoreResult<()>;

    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>>;

    /// Start a full scan over all entries in ascending key order.
    async fn scan(&self) -> StoreResult<Scan>;

    /// Flush outstanding writes and release the backend.
    async fn close(&self) -> StoreResult<()>;

    /// Count all entries with a full scan.
    ///
    /// The default walks the whole keyspace and propagates the first
    /// scan error.
    async fn count(&self) -> StoreResult<u64> {
        let mut count = 0u64;
        for entry in self.scan().await? {
            entry?;
            count += 1;
        }
        Ok(count)
    }
}
