//! Ordered key-value storage for the chainkv ledger.
//!
//! The ledger persists one record per block, keyed by block height. This
//! crate provides the store boundary the ledger talks to and the backends
//! behind it.
//!
//! # Storage Backends
//!
//! All backends implement the [`KvStore`] trait:
//!
//! - [`MemoryStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`LogStore`] -- crash-recoverable append-only log file
//! - [`SledStore`] -- embedded sled database
//!
//! # Design Rules
//!
//! 1. Keys are heights; scans always yield ascending key order.
//! 2. `put` is an upsert; the store never interprets values.
//! 3. Durability and on-disk layout belong to the backend, not the ledger.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod error;
pub mod log;
pub mod memory;
pub mod sled_store;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{open_store, Backend, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use log::{LogStore, SyncMode};
pub use memory::MemoryStore;
pub use sled_store::SledStore;
pub use traits::{Entry, KvStore, Scan};
