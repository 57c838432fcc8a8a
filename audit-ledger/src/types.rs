//! Core types for the ledger
//!
//! A [`Block`] is the only persisted unit. Its five fields are hashed via
//! the canonical JSON encoding, so their names are part of the digest
//! contract.

use crate::{canonical, crypto};
use chrono::Local;
use serde::{Deserialize, Serialize};

/// Payload of the genesis block
pub const GENESIS_PAYLOAD: &str = "Genesis Block";

/// `previous_hash` of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Proof of the genesis block (trusted root, never checked against the seal)
pub const GENESIS_PROOF: u64 = 1;

/// Capture time in the ledger's informational format
/// (`YYYY-MM-DD HH:MM:SS.ffffff`, local time)
pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Sealed block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (0 = genesis)
    pub index: u64,

    /// Creation time, informational only
    pub timestamp: String,

    /// Serialized record or the genesis marker
    pub payload: String,

    /// Proof-of-work nonce
    pub proof: u64,

    /// Digest of the previous block, `"0"` for genesis
    pub previous_hash: String,
}

impl Block {
    /// Create the genesis block
    pub fn genesis() -> Self {
        Self {
            index: 0,
            timestamp: now_timestamp(),
            payload: GENESIS_PAYLOAD.to_string(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    /// Canonical bytes used for the block digest
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical::to_canonical_vec(self).expect("block serialization cannot fail")
    }

    /// Digest of the whole block, as referenced by the next block
    pub fn digest(&self) -> String {
        crypto::sha256_hex(&self.canonical_bytes())
    }

    /// Whether this is a root block
    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }
}
