//! Error types for the audit ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Chain corruption is deliberately absent: the validator reports it as a
/// [`ChainReport`](crate::validation::ChainReport) value instead.
#[derive(Error, Debug)]
pub enum Error {
    /// No proof found within the configured attempt budget
    #[error("Sealing failed for block {index} after {attempts} attempts")]
    SealingFailed {
        /// Index of the block being sealed
        index: u64,
        /// Attempts spent before giving up
        attempts: u64,
    },

    /// No record matched the query (e.g. closing an unknown vote)
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Writes are halted after a failed integrity audit
    #[error("Writes halted: chain is invalid at block {index}")]
    WritesHalted {
        /// First invalid block index reported by the audit
        index: u64,
    },

    /// Block does not extend the current tail
    #[error("Block rejected: {0}")]
    BlockRejected(String),

    /// Caller lacks the role required for the action
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// User is not present in the read-through cache
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Ancillary data cipher failure or missing cipher
    #[error("Cipher error: {0}")]
    Cipher(String),

    /// Admin notification could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),

    /// Block sink refused a sealed block
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
