//! Actor-based concurrency for the ledger
//!
//! Single-writer pattern using a Tokio actor:
//! - One task owns the append path, so indices never collide
//! - Sealing runs on the blocking pool, off the async workers
//! - Readers take the shared read lock and never go through the mailbox
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Request handlers (voting, contracts, ...)      │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   candidate()  ── read lock                           │
//! │   seal()       ── spawn_blocking, no lock             │
//! │   push()       ── write lock                          │
//! │   persist()    ── BlockSink, failure only logged      │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::chain::Chain;
use crate::hooks::BlockSink;
use crate::metrics::Metrics;
use crate::pow::Sealer;
use crate::types::Block;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Seal and append a payload
    Append {
        /// Record payload
        payload: String,
        /// Reply with the appended block
        response: oneshot::Sender<Result<Block>>,
    },

    /// Refuse further appends after a failed audit
    Halt {
        /// First invalid block reported by the audit
        index: u64,
        /// Acknowledgement
        response: oneshot::Sender<()>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the append path
#[derive(Debug)]
pub struct LedgerActor {
    /// Shared chain
    chain: Arc<RwLock<Chain>>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Proof searcher
    sealer: Sealer,

    /// Optional persistence collaborator
    sink: Option<Arc<dyn BlockSink>>,

    /// Metrics
    metrics: Metrics,

    /// Set once writes are halted
    halted_at: Option<u64>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        chain: Arc<RwLock<Chain>>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        sealer: Sealer,
        sink: Option<Arc<dyn BlockSink>>,
        metrics: Metrics,
    ) -> Self {
        Self {
            chain,
            mailbox,
            sealer,
            sink,
            metrics,
            halted_at: None,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Append { payload, response } => {
                    let result = self.append(payload).await;
                    if let Err(e) = &result {
                        warn!(error = %e, "Append failed");
                    }
                    let _ = response.send(result);
                }

                LedgerMessage::Halt { index, response } => {
                    if self.halted_at.is_none() {
                        error!(index, "Halting writes after failed integrity check");
                        self.halted_at = Some(index);
                    }
                    let _ = response.send(());
                }

                LedgerMessage::Shutdown => break,
            }
        }

        info!("Ledger actor stopped");
    }

    /// Seal, append and persist one block
    async fn append(&mut self, payload: String) -> Result<Block> {
        if let Some(index) = self.halted_at {
            return Err(Error::WritesHalted { index });
        }

        let candidate = self.chain.read().candidate(payload);
        let sealer = self.sealer;
        let started = Instant::now();

        let (block, attempts) = tokio::task::spawn_blocking(move || candidate.seal(&sealer))
            .await
            .map_err(|e| Error::Concurrency(format!("Sealing task failed: {}", e)))??;

        let length = {
            let mut chain = self.chain.write();
            chain.push(block.clone())?;
            chain.len()
        };

        self.metrics
            .record_block_appended(attempts, started.elapsed().as_secs_f64());
        self.metrics.set_chain_length(length);
        debug!(index = block.index, proof = block.proof, attempts, "Block appended");

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.persist(&block) {
                error!(index = block.index, error = %e, "Failed to persist block");
            }
        }

        Ok(block)
    }
}

/// Handle for sending messages to the actor
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Seal and append a payload
    pub async fn append(&self, payload: impl Into<String>) -> Result<Block> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Append {
                payload: payload.into(),
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Halt writes
    pub async fn halt(&self, index: u64) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Halt {
                index,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }

    /// Shutdown actor; messages already queued are processed first
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    chain: Arc<RwLock<Chain>>,
    sealer: Sealer,
    sink: Option<Arc<dyn BlockSink>>,
    metrics: Metrics,
    mailbox_capacity: usize,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let actor = LedgerActor::new(chain, rx, sealer, sink, metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
