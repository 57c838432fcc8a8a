//! Collaborator hooks
//!
//! The ledger calls out to two optional collaborators:
//!
//! - a [`BlockSink`] that receives every sealed block (durability lives
//!   there, not in the sealing path)
//! - an [`AdminNotifier`] told about failed integrity audits
//!
//! Both calls are synchronous and may fail. A failure is logged and never
//! rolls back a block that is already on the chain.

use crate::{types::Block, Result};
use std::fmt;
use tracing::warn;

/// Receives each block after it is appended
pub trait BlockSink: Send + Sync {
    /// Persist one sealed block
    fn persist(&self, block: &Block) -> Result<()>;
}

/// Receives integrity alerts
pub trait AdminNotifier: Send + Sync {
    /// Deliver one message
    fn notify(&self, message: &str) -> Result<()>;
}

/// Notifier that only writes a log line
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl AdminNotifier for LogNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        warn!(message, "Admin notification");
        Ok(())
    }
}

impl fmt::Debug for dyn BlockSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BlockSink")
    }
}

impl fmt::Debug for dyn AdminNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminNotifier")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify("integrity check failed").is_ok());
    }
}
