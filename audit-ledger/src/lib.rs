//! Audit Ledger
//!
//! Single-writer, append-only, hash-chained audit log with proof-of-work
//! sealing.
//!
//! # Architecture
//!
//! - **Hash chain**: every block commits to the canonical digest of its predecessor
//! - **Proof-of-work**: each block carries a proof meeting a leading-zero target
//! - **Single Writer**: one actor task owns appends; readers share a lock
//! - **Chain as source of truth**: read models are rebuilt by reverse scan
//!
//! # Invariants
//!
//! - `previous_hash[i] == digest(block[i-1])` for every block after genesis
//! - `index[i] == i`
//! - Append-only: blocks are never modified or removed
//! - Corruption is reported, never thrown

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod canonical;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod hooks;
pub mod ledger;
pub mod metrics;
pub mod pow;
pub mod records;
pub mod types;
pub mod users;
pub mod validation;

// Re-exports
pub use chain::Chain;
pub use config::{Config, CorruptionPolicy};
pub use error::{Error, Result};
pub use hooks::{AdminNotifier, BlockSink, LogNotifier};
pub use ledger::{AuditLedger, LedgerBuilder};
pub use pow::Sealer;
pub use records::{Ballot, Record, VoteMap, VoteTally};
pub use types::Block;
pub use users::{Role, User, UserDirectory};
pub use validation::{validate_chain, ChainReport, ChainViolation, ViolationKind};
