//! Sled-backed store.
//!
//! Keys are encoded as big-endian `u64` so sled's lexicographic byte order
//! matches ascending numeric height order.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sled::{Db, IVec, Tree};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{Entry, KvStore, Scan};

/// Name of the sled tree holding blocks keyed by height.
const TREE_BLOCKS: &str = "blocks_by_height";

/// Durable store backed by an embedded sled database.
pub struct SledStore {
    db: Db,
    blocks: Tree,
    closed: AtomicBool,
}

impl SledStore {
    /// Open or create a sled database at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "sled store opened");
        Self::from_db(db)
    }

    /// Open a throwaway database that is removed on drop.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let blocks = db.open_tree(TREE_BLOCKS)?;
        Ok(Self {
            db,
            blocks,
            closed: AtomicBool::new(false),
        })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

/// Encode a height as a big-endian sled key.
pub fn encode_key(key: u64) -> [u8; 8] {
    key.to_be_bytes()
}

/// Decode a big-endian sled key back into a height.
pub fn decode_key(bytes: &[u8]) -> StoreResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::CorruptKey { len: bytes.len() })?;
    Ok(u64::from_be_bytes(raw))
}

fn decode_entry(item: sled::Result<(IVec, IVec)>) -> StoreResult<Entry> {
    let (key, value) = item?;
    Ok((decode_key(&key)?, value.to_vec()))
}

#[async_trait]
impl KvStore for SledStore {
    async fn put(&self, key: u64, value: Vec<u8>) -> StoreResult<()> {
        self.ensure_open()?;
        self.blocks.insert(encode_key(key), value)?;
        self.blocks.flush()?;
        debug!(key, "sled put");
        Ok(())
    }

    async fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.blocks.get(encode_key(key))?.map(|v| v.to_vec()))
    }

    async fn scan(&self) -> StoreResult<Scan> {
        self.ensure_open()?;
        Ok(Box::new(self.blocks.iter().map(decode_entry)))
    }

    async fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.db.flush()?;
        debug!("sled store closed");
        Ok(())
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("entries", &self.blocks.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
