//! Proof-of-work sealing
//!
//! A block is sealed when
//! `sha256(decimal(proof² - previous_proof² + index) ++ payload)`
//! starts with `difficulty` zero hex characters. The residual construction
//! carries no security weight; it is the contract shared by the sealer and
//! the validator.
//!
//! The search is CPU bound and unbounded by default. Callers that need a
//! latency bound set `max_attempts` and receive [`Error::SealingFailed`].

use crate::{config::SealingConfig, crypto, types::Block, Error, Result};

/// Default number of leading zero hex characters
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Hex characters in a SHA-256 digest; no proof can exceed this target
pub const MAX_DIFFICULTY: usize = 64;

/// `proof² - previous_proof² + index` in exact arithmetic
///
/// `None` when the value does not fit in an `i128`; such a proof can never
/// satisfy the predicate.
pub fn seal_residual(proof: u64, previous_proof: u64, index: u64) -> Option<i128> {
    let proof = i128::from(proof);
    let previous_proof = i128::from(previous_proof);

    proof
        .checked_mul(proof)?
        .checked_sub(previous_proof.checked_mul(previous_proof)?)?
        .checked_add(i128::from(index))
}

/// Bytes hashed by the seal predicate
pub fn seal_preimage(proof: u64, previous_proof: u64, index: u64, payload: &str) -> Option<Vec<u8>> {
    let residual = seal_residual(proof, previous_proof, index)?;
    let mut bytes = residual.to_string().into_bytes();
    bytes.extend_from_slice(payload.as_bytes());
    Some(bytes)
}

/// Seal digest (raw bytes)
pub fn seal_digest(proof: u64, previous_proof: u64, index: u64, payload: &str) -> Option<[u8; 32]> {
    seal_preimage(proof, previous_proof, index, payload).map(|bytes| crypto::hash_bytes(&bytes))
}

/// Seal digest as lowercase hex
pub fn seal_digest_hex(proof: u64, previous_proof: u64, index: u64, payload: &str) -> Option<String> {
    seal_digest(proof, previous_proof, index, payload).map(hex::encode)
}

/// Whether the hex rendering of `hash` starts with `difficulty` zeros
pub fn meets_difficulty(hash: &[u8; 32], difficulty: usize) -> bool {
    if difficulty > MAX_DIFFICULTY {
        return false;
    }

    let full_bytes = difficulty / 2;
    if hash[..full_bytes].iter().any(|b| *b != 0) {
        return false;
    }

    // Odd difficulty: high nibble of the next byte
    difficulty % 2 == 0 || hash[full_bytes] >> 4 == 0
}

/// Check a proof against the seal predicate
pub fn verify_seal(
    proof: u64,
    previous_proof: u64,
    index: u64,
    payload: &str,
    difficulty: usize,
) -> bool {
    seal_digest(proof, previous_proof, index, payload)
        .map(|hash| meets_difficulty(&hash, difficulty))
        .unwrap_or(false)
}

/// Result of a successful search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seal {
    /// Proof satisfying the predicate
    pub proof: u64,
    /// Number of candidates tried
    pub attempts: u64,
}

/// Brute-force proof searcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sealer {
    difficulty: usize,
    max_attempts: Option<u64>,
}

impl Default for Sealer {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl Sealer {
    /// Create an unbounded sealer
    pub fn new(difficulty: usize) -> Self {
        Self {
            difficulty,
            max_attempts: None,
        }
    }

    /// Build from configuration
    pub fn from_config(config: &SealingConfig) -> Self {
        Self {
            difficulty: config.difficulty,
            max_attempts: config.max_attempts,
        }
    }

    /// Cap the number of candidates per block
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Required leading zero hex characters
    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Attempt cap, if any
    pub fn max_attempts(&self) -> Option<u64> {
        self.max_attempts
    }

    /// Find the smallest proof >= 1 satisfying the predicate
    pub fn seal(&self, previous_proof: u64, index: u64, payload: &str) -> Result<Seal> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(Error::SealingFailed { index, attempts: 0 });
        }

        let mut proof: u64 = 1;
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;

            if verify_seal(proof, previous_proof, index, payload, self.difficulty) {
                return Ok(Seal { proof, attempts });
            }

            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(Error::SealingFailed { index, attempts });
            }

            proof = proof
                .checked_add(1)
                .ok_or(Error::SealingFailed { index, attempts })?;
        }
    }

    /// Check `block` against its predecessor's proof
    pub fn verify(&self, previous_proof: u64, block: &Block) -> bool {
        verify_seal(
            block.proof,
            previous_proof,
            block.index,
            &block.payload,
            self.difficulty,
        )
    }
}
