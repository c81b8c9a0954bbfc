use std::path::{Path, PathBuf};

use anyhow::Context;
use chainkv_ledger::LedgerConfig;
use chainkv_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "chainkv.toml";

/// Full CLI configuration: `[store]` and `[ledger]` tables.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store: StoreConfig,
    pub ledger: LedgerConfig,
}

impl CliConfig {
    /// Read `path`, or `chainkv.toml` if it exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Command-line flags win over file values.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.data_dir {
            self.store.path = dir.clone();
        }
        if let Some(backend) = cli.backend {
            self.store.backend = backend;
        }
    }
}
