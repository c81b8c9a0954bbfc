use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::hash::sha256_hex;

/// Body of the block at height 0.
pub const GENESIS_BODY: &str = "GenesisBlock";

/// One ledger record.
///
/// Field order is the canonical serialization order: the stored value and the
/// hash preimage are both compact JSON of this struct, the preimage with
/// `hash` set to the empty string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Lowercase hex SHA-256 of the block with this field emptied.
    pub hash: String,
    /// Zero-based position in the ledger.
    pub height: u64,
    /// Caller-supplied payload.
    pub body: String,
    /// Seconds since the UNIX epoch, assigned at append.
    pub time: u64,
    /// Hash of the block at `height - 1`; empty for genesis.
    #[serde(rename = "previousBlockHash")]
    pub previous_block_hash: String,
}

impl Block {
    /// A candidate block carrying only a body. The engine assigns the rest.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            hash: String::new(),
            height: 0,
            body: body.into(),
            time: 0,
            previous_block_hash: String::new(),
        }
    }

    /// A sealed genesis block stamped with `time`.
    pub fn genesis(time: u64) -> LedgerResult<Self> {
        let mut block = Self::new(GENESIS_BODY);
        block.time = time;
        block.seal()?;
        Ok(block)
    }

    /// Whether this candidate asks to become the genesis block.
    pub fn is_genesis_candidate(&self) -> bool {
        self.body == GENESIS_BODY
    }

    /// Compact JSON of the block with `hash` emptied.
    pub fn canonical_bytes(&self) -> LedgerResult<Vec<u8>> {
        let unsealed = Self {
            hash: String::new(),
            ..self.clone()
        };
        serde_json::to_vec(&unsealed).map_err(|e| LedgerError::Encode(e.to_string()))
    }

    /// Recompute the hash from the other fields.
    pub fn compute_hash(&self) -> LedgerResult<String> {
        Ok(sha256_hex(&self.canonical_bytes()?))
    }

    /// Compute and store the hash.
    pub fn seal(&mut self) -> LedgerResult<()> {
        self.hash = self.compute_hash()?;
        Ok(())
    }

    /// Self-integrity check: stored hash equals recomputed hash.
    pub fn verify_hash(&self) -> LedgerResult<bool> {
        Ok(self.compute_hash()? == self.hash)
    }

    /// Serialize for storage.
    pub fn encode(&self) -> LedgerResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LedgerError::Encode(e.to_string()))
    }

    /// Parse a stored value read from key `height`.
    pub fn decode(height: u64, bytes: &[u8]) -> LedgerResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| LedgerError::Decode {
            height,
            reason: e.to_string(),
        })
    }
}
