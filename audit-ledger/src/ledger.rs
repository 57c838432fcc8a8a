//! Main ledger orchestration layer
//!
//! Ties together the block store, the writer actor, the validator and the
//! record layer into the API collaborators call: typed record appends,
//! reverse-scan reads and the integrity audit.
//!
//! # Example
//!
//! ```no_run
//! use audit_ledger::{AuditLedger, Config};
//!
//! #[tokio::main]
//! async fn main() -> audit_ledger::Result<()> {
//!     let ledger = AuditLedger::open(Config::default()).await?;
//!
//!     ledger.record_security_event("Service started").await?;
//!     let report = ledger.audit_chain().await?;
//!     assert!(report.is_valid());
//!
//!     ledger.shutdown().await
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    chain::Chain,
    config::CorruptionPolicy,
    crypto::{self, DataCipher},
    hooks::{AdminNotifier, BlockSink, LogNotifier},
    metrics::Metrics,
    pow::Sealer,
    records::{self, Ballot, Record, RecordEntry, VoteMap, VoteTally},
    types::Block,
    users::{Role, User, UserDirectory},
    validation::{validate_chain, ChainReport},
    Config, Error, Result,
};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

const INTEGRITY_PASSED: &str = "Blockchain integrity check passed";
const INTEGRITY_FAILED: &str = "Blockchain integrity check failed";

/// Builder for [`AuditLedger`]
pub struct LedgerBuilder {
    config: Config,
    blocks: Option<Vec<Block>>,
    sink: Option<Arc<dyn BlockSink>>,
}

impl LedgerBuilder {
    /// Start from configuration
    pub fn new(config: Config) -> Self {
        Self {
            config,
            blocks: None,
            sink: None,
        }
    }

    /// Resume from blocks loaded by a persistence collaborator
    ///
    /// The blocks are not validated here; call [`AuditLedger::audit_chain`].
    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = Some(blocks);
        self
    }

    /// Install a sink that receives every appended block
    pub fn with_sink(mut self, sink: Arc<dyn BlockSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Spawn the writer and return the ledger
    pub async fn open(self) -> Result<AuditLedger> {
        self.config.validate()?;

        let chain = match self.blocks {
            Some(blocks) => Chain::from_blocks(blocks)?,
            None => {
                let chain = Chain::new();
                // A fresh root must reach the sink too, or it cannot be restored
                if let Some(sink) = &self.sink {
                    if let Err(e) = sink.persist(chain.genesis()) {
                        error!(error = %e, "Failed to persist genesis block");
                    }
                }
                chain
            }
        };
        let chain_length = chain.len();
        let chain = Arc::new(RwLock::new(chain));

        let metrics = Metrics::new()
            .map_err(|e| Error::Other(format!("Failed to create metrics: {}", e)))?;
        metrics.set_chain_length(chain_length);

        let handle = spawn_ledger_actor(
            chain.clone(),
            Sealer::from_config(&self.config.sealing),
            self.sink,
            metrics.clone(),
            self.config.actor.mailbox_capacity,
        );

        info!(
            chain_length,
            difficulty = self.config.sealing.difficulty,
            "Audit ledger opened"
        );

        Ok(AuditLedger {
            handle,
            chain,
            users: UserDirectory::new(),
            notifier: Arc::new(LogNotifier),
            cipher: None,
            metrics,
            config: self.config,
        })
    }
}

impl fmt::Debug for LedgerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerBuilder")
            .field("config", &self.config)
            .field("blocks", &self.blocks.as_ref().map(Vec::len))
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Main ledger interface
pub struct AuditLedger {
    /// Actor handle for appends
    handle: LedgerHandle,

    /// Shared chain (for reads)
    chain: Arc<RwLock<Chain>>,

    /// Read-through user cache
    users: UserDirectory,

    /// Integrity alert channel
    notifier: Arc<dyn AdminNotifier>,

    /// Ancillary data cipher (if supplied)
    cipher: Option<Arc<dyn DataCipher>>,

    /// Metrics
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl AuditLedger {
    /// Open a fresh ledger holding only genesis
    pub async fn open(config: Config) -> Result<Self> {
        LedgerBuilder::new(config).open().await
    }

    /// Builder for restored chains and sinks
    pub fn builder(config: Config) -> LedgerBuilder {
        LedgerBuilder::new(config)
    }

    /// Replace the admin notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn AdminNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Set the ancillary data cipher
    pub fn with_cipher(mut self, cipher: Arc<dyn DataCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    // ===== Block store =====

    /// Seal and append a raw payload
    pub async fn append(&self, payload: impl Into<String>) -> Result<Block> {
        self.handle.append(payload).await
    }

    /// Encode and append a typed record
    pub async fn append_record(&self, record: &Record) -> Result<Block> {
        let payload = record.encode()?;
        self.handle.append(payload).await
    }

    /// Most recently appended block
    pub fn tail(&self) -> Block {
        self.chain.read().tail().clone()
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.chain.read().len()
    }

    /// Always false: genesis is created on open
    pub fn is_empty(&self) -> bool {
        self.chain.read().is_empty()
    }

    /// Block at `index`
    pub fn get_block(&self, index: u64) -> Option<Block> {
        self.chain.read().get(index).cloned()
    }

    /// Snapshot of every block in chain order
    pub fn blocks(&self) -> Vec<Block> {
        self.chain.read().blocks().to_vec()
    }

    // ===== Integrity =====

    /// Validate the whole chain against the configured difficulty
    pub fn validate(&self) -> ChainReport {
        let chain = self.chain.read();
        validate_chain(chain.blocks(), self.config.sealing.difficulty)
    }

    /// Validate and record the outcome
    ///
    /// A passing audit appends a security event. A failing one bumps the
    /// failure counter and notifies the admin, then either appends the
    /// failure event ([`CorruptionPolicy::Continue`]) or halts the writer
    /// ([`CorruptionPolicy::HaltWrites`]).
    pub async fn audit_chain(&self) -> Result<ChainReport> {
        let report = self.validate();

        let Some(index) = report.first_invalid_index() else {
            info!(chain_length = report.chain_length, "{}", INTEGRITY_PASSED);
            self.record_security_event(INTEGRITY_PASSED).await?;
            return Ok(report);
        };

        self.metrics.record_integrity_failure();
        warn!(index, "{}", INTEGRITY_FAILED);

        let outcome = match self.config.integrity.on_corruption {
            CorruptionPolicy::Continue => self
                .record_security_event(INTEGRITY_FAILED)
                .await
                .map(|_| ()),
            CorruptionPolicy::HaltWrites => self.handle.halt(index).await,
        };

        self.notify_admin(INTEGRITY_FAILED);
        outcome?;

        Ok(report)
    }

    fn notify_admin(&self, message: &str) {
        if let Err(e) = self.notifier.notify(message) {
            warn!(error = %e, "Failed to notify admin");
        }
    }

    // ===== Votes =====

    /// Record an open vote snapshot
    pub async fn record_vote(&self, issue: &str, votes: VoteMap) -> Result<Block> {
        self.append_record(&Record::vote(issue, votes)).await
    }

    /// Fold ballots into a vote map and record it
    pub async fn collect_votes(&self, issue: &str, ballots: Vec<Ballot>) -> Result<VoteMap> {
        let votes = records::tally_ballots(ballots);
        self.record_vote(issue, votes.clone()).await?;
        Ok(votes)
    }

    /// Current state of the latest vote on `issue`
    pub fn vote_tally(&self, issue: &str) -> Option<VoteTally> {
        records::find_vote_tally(&*self.chain.read(), issue)
    }

    /// Votes from the latest snapshot on `issue`, empty if none
    pub fn latest_vote_result(&self, issue: &str) -> VoteMap {
        self.vote_tally(issue)
            .map(|tally| tally.votes)
            .unwrap_or_default()
    }

    /// Close the latest vote on `issue` and return its votes
    ///
    /// Appends exactly one `VoteClosed` block; the snapshot block is left as
    /// it was. The returned votes are those of the snapshot the marker
    /// actually closes, i.e. the newest one below the marker block.
    pub async fn close_vote(&self, issue: &str) -> Result<VoteMap> {
        let not_found = || Error::RecordNotFound(format!("No vote on issue '{}'", issue));
        if self.vote_tally(issue).is_none() {
            return Err(not_found());
        }

        let block = self.append_record(&Record::vote_closed(issue)).await?;

        let tally = {
            let chain = self.chain.read();
            let blocks = chain.blocks();
            let end = usize::try_from(block.index)
                .unwrap_or(blocks.len())
                .min(blocks.len());
            records::find_vote_tally(&blocks[..end], issue)
        }
        .ok_or_else(not_found)?;

        info!(
            issue,
            index = block.index,
            snapshot = tally.recorded_at,
            "Vote closed"
        );
        Ok(tally.votes)
    }

    // ===== Contracts, access, security =====

    /// Record a contract edit plus its audit-trail event
    ///
    /// Returns the contract block.
    pub async fn record_contract_change(
        &self,
        username: &str,
        details: serde_json::Value,
    ) -> Result<Block> {
        let contract_hash = crypto::digest(&details)?;
        let block = self
            .append_record(&Record::contract_change(username, contract_hash, details))
            .await?;

        self.record_security_event(format!("Contract change added for {}", username))
            .await?;

        Ok(block)
    }

    /// Record a data read plus its audit-trail event
    ///
    /// Returns the access block.
    pub async fn record_data_access(
        &self,
        accessing_user: &str,
        target_user: &str,
        data_key: &str,
    ) -> Result<Block> {
        let block = self
            .append_record(&Record::data_access(accessing_user, target_user, data_key))
            .await?;

        self.record_security_event(format!(
            "Data access by {} to {}'s data key {}",
            accessing_user, target_user, data_key
        ))
        .await?;

        Ok(block)
    }

    /// Check access against the user cache, then record the read
    pub async fn access_user_data(
        &self,
        accessing_user: &User,
        target_username: &str,
        data_key: &str,
    ) -> Result<Block> {
        if !self.users.check_access(accessing_user, data_key) {
            return Err(Error::PermissionDenied(format!(
                "{} may not read {}'s data key {}",
                accessing_user.username, target_username, data_key
            )));
        }

        let target = self
            .users
            .get_user(target_username)
            .ok_or_else(|| Error::UserNotFound(target_username.to_string()))?;

        self.record_data_access(&accessing_user.username, &target.username, data_key)
            .await
    }

    /// Append a free-form audit-trail entry
    pub async fn record_security_event(&self, event: impl Into<String>) -> Result<Block> {
        self.append_record(&Record::security_event(event)).await
    }

    /// Every decodable record in chain order
    pub fn history(&self) -> Vec<RecordEntry> {
        records::decode_all(&*self.chain.read())
    }

    // ===== Users =====

    /// Read-through user cache
    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    /// Change a user's role and record it
    pub async fn assign_role(&self, admin: &User, target: &User, role: Role) -> Result<User> {
        let updated = self.users.assign_role(admin, target, role)?;

        self.record_security_event(format!(
            "Role of {} changed to {} by {}",
            updated.username, role, admin.username
        ))
        .await?;

        Ok(updated)
    }

    // ===== Ancillary data =====

    /// Encrypt with the supplied cipher
    pub fn encrypt_data(&self, plaintext: &str) -> Result<String> {
        self.cipher()?.encrypt(plaintext)
    }

    /// Decrypt with the supplied cipher
    pub fn decrypt_data(&self, token: &str) -> Result<String> {
        self.cipher()?.decrypt(token)
    }

    fn cipher(&self) -> Result<&Arc<dyn DataCipher>> {
        self.cipher
            .as_ref()
            .ok_or_else(|| Error::Cipher("No cipher configured".to_string()))
    }

    // ===== Lifecycle =====

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop the writer after queued appends finish
    pub async fn shutdown(self) -> Result<()> {
        info!(chain_length = self.len(), "Shutting down audit ledger");
        self.handle.shutdown().await
    }
}

impl fmt::Debug for AuditLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLedger")
            .field("chain_length", &self.len())
            .field("users", &self.users.len())
            .field("cipher", &self.cipher.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
