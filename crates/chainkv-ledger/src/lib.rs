//! Tamper-evident block ledger for chainkv.
//!
//! This crate turns an ordered [`chainkv_store::KvStore`] into a hash-linked
//! chain of blocks. It provides:
//! - The [`Block`] record with canonical JSON encoding and SHA-256 sealing
//! - The [`Blockchain`] engine: genesis bootstrap, serialized appends,
//!   height derivation from the store
//! - Single-block and whole-chain validation with [`ChainReport`]
//! - Pluggable timestamps through [`Clock`]

pub mod block;
pub mod chain;
pub mod clock;
pub mod config;
pub mod error;
pub mod hash;
pub mod validation;

pub use block::{Block, GENESIS_BODY};
pub use chain::Blockchain;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{HeightMode, LedgerConfig};
pub use error::{LedgerError, LedgerResult};
pub use hash::{sha256_hex, verify_sha256_hex};
pub use validation::{ChainReport, Violation, ViolationKind};
