use serde::{Deserialize, Serialize};

/// How the engine learns the current chain height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightMode {
    /// Count entries with a full store scan on every call.
    #[default]
    Scan,
    /// Scan once, then keep the height in memory under the writer lock and
    /// advance it on every successful append. Only valid while this engine
    /// is the sole writer of the store.
    Cached,
}

/// Ledger engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub height_mode: HeightMode,
}
