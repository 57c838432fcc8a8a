//! Chain validation
//!
//! Re-derives every link and re-checks every seal from block 1 onward.
//! Genesis is a trusted root and is not checked against the seal predicate.
//! Proof minimality is not checked; only the predicate is.
//!
//! Corruption is reported as data ([`ChainReport`]), never as an error.

use crate::{pow::verify_seal, types::Block};
use std::fmt;
use tracing::warn;

/// Why a block failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// `previous_hash` does not match the digest of the preceding block
    BrokenLink {
        /// Digest of the preceding block
        expected: String,
        /// Value stored in the block
        found: String,
    },
    /// Stored index differs from the block's position
    IndexMismatch {
        /// Position in the chain
        expected: u64,
        /// Value stored in the block
        found: u64,
    },
    /// Proof does not satisfy the seal predicate
    InvalidSeal,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::BrokenLink { expected, found } => {
                write!(f, "broken link (expected {}, found {})", expected, found)
            }
            ViolationKind::IndexMismatch { expected, found } => {
                write!(f, "index mismatch (expected {}, found {})", expected, found)
            }
            ViolationKind::InvalidSeal => write!(f, "invalid seal"),
        }
    }
}

/// First failing block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainViolation {
    /// Position of the failing block
    pub index: u64,
    /// Failure reason
    pub kind: ViolationKind,
}

/// Outcome of a whole-chain validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    /// Number of blocks in the validated chain
    pub chain_length: usize,
    /// First violation, if any
    pub violation: Option<ChainViolation>,
}

impl ChainReport {
    /// True if every pair passed
    pub fn is_valid(&self) -> bool {
        self.violation.is_none()
    }

    /// Index of the first failing block
    pub fn first_invalid_index(&self) -> Option<u64> {
        self.violation.as_ref().map(|v| v.index)
    }
}

/// Validate a chain in O(N)
pub fn validate_chain(blocks: &[Block], difficulty: usize) -> ChainReport {
    for (offset, pair) in blocks.windows(2).enumerate() {
        let index = offset as u64 + 1;

        if let Some(kind) = check_link(&pair[0], &pair[1], index, difficulty) {
            warn!(index, reason = %kind, "Invalid block");
            return ChainReport {
                chain_length: blocks.len(),
                violation: Some(ChainViolation { index, kind }),
            };
        }
    }

    ChainReport {
        chain_length: blocks.len(),
        violation: None,
    }
}

fn check_link(
    previous: &Block,
    next: &Block,
    position: u64,
    difficulty: usize,
) -> Option<ViolationKind> {
    let expected = previous.digest();
    if next.previous_hash != expected {
        return Some(ViolationKind::BrokenLink {
            expected,
            found: next.previous_hash.clone(),
        });
    }

    if next.index != position {
        return Some(ViolationKind::IndexMismatch {
            expected: position,
            found: next.index,
        });
    }

    if !verify_seal(next.proof, previous.proof, next.index, &next.payload, difficulty) {
        return Some(ViolationKind::InvalidSeal);
    }

    None
}
