use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreResult;
use crate::log::{LogStore, SyncMode};
use crate::memory::MemoryStore;
use crate::sled_store::SledStore;
use crate::traits::KvStore;

/// Which storage backend to open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Volatile `BTreeMap` store.
    Memory,
    /// Append-only CRC-framed log file.
    #[default]
    Log,
    /// Embedded sled database.
    Sled,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "log" => Ok(Self::Log),
            "sled" => Ok(Self::Sled),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Log => write!(f, "log"),
            Self::Sled => write!(f, "sled"),
        }
    }
}

/// Storage configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: Backend,
    /// Data directory. The log backend writes `chain.log` inside it; sled
    /// uses the directory itself.
    pub path: PathBuf,
    pub sync_mode: SyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            path: PathBuf::from("chaindata"),
            sync_mode: SyncMode::default(),
        }
    }
}

/// File name of the log backend inside the data directory.
pub const LOG_FILE_NAME: &str = "chain.log";

/// Open the backend described by `config`.
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn KvStore>> {
    info!(backend = %config.backend, path = %config.path.display(), "opening store");
    let store: Arc<dyn KvStore> = match config.backend {
        Backend::Memory => Arc::new(MemoryStore::new()),
        Backend::Log => Arc::new(LogStore::open(
            &config.path.join(LOG_FILE_NAME),
            config.sync_mode,
        )?),
        Backend::Sled => Arc::new(SledStore::open(&config.path)?),
    };
    Ok(store)
}
