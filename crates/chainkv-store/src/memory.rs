use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::{KvStore, Scan};

/// In-memory, `BTreeMap`-based store.
///
/// Intended for tests and embedding. Entries are held behind a `RwLock`;
/// values are cloned on read/write. A scan iterates over a snapshot taken
/// when the scan starts.
pub struct MemoryStore {
    entries: RwLock<BTreeMap<u64, Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.read_entries().map(|map| map.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn read_entries(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<u64, Vec<u8>>>> {
        self.entries
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn write_entries(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<u64, Vec<u8>>>> {
        self.entries
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn put(&self, key: u64, value: Vec<u8>) -> StoreResult<()> {
        self.ensure_open()?;
        self.write_entries()?.insert(key, value);
        Ok(())
    }

    async fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.read_entries()?.get(&key).cloned())
    }

    async fn scan(&self) -> StoreResult<Scan> {
        self.ensure_open()?;
        let snapshot: Vec<(u64, Vec<u8>)> = self
            .read_entries()?
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entry_count", &self.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
