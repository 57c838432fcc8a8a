//! Typed application records carried in block payloads
//!
//! Records are stored as canonical JSON tagged with `"type"`, e.g.
//!
//! ```text
//! {"closed": false, "issue": "budget", "timestamp": "...", "type": "vote", "votes": {"alice": "yes"}}
//! ```
//!
//! There is no materialized state table. Read models such as the current
//! vote tally are rebuilt by scanning the chain, newest block first.

use crate::{canonical, types::now_timestamp, types::Block, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Voter → choice
pub type VoteMap = BTreeMap<String, String>;

/// Application event embedded in a block payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    /// Employee contract edit
    ContractChange {
        /// Employee whose contract changed
        username: String,
        /// Digest of the canonical contract details
        contract_hash: String,
        /// Contract details as submitted
        details: serde_json::Value,
        /// Capture time
        timestamp: String,
    },

    /// Vote snapshot for an issue
    Vote {
        /// Issue being voted on
        issue: String,
        /// Voter → choice
        votes: VoteMap,
        /// Set by legacy writers that re-submitted the whole vote on close
        #[serde(default)]
        closed: bool,
        /// Capture time
        timestamp: String,
    },

    /// State transition closing the latest vote on an issue
    VoteClosed {
        /// Issue being closed
        issue: String,
        /// Capture time
        timestamp: String,
    },

    /// One user reading another user's data
    DataAccess {
        /// Reader
        accessing_user: String,
        /// Owner of the data
        target_user: String,
        /// Key that was read
        data_key: String,
        /// Capture time
        timestamp: String,
    },

    /// Free-form audit trail entry
    SecurityEvent {
        /// Description
        event: String,
        /// Capture time
        timestamp: String,
    },
}

impl Record {
    /// Contract change; `contract_hash` must be the digest of `details`
    pub fn contract_change(
        username: impl Into<String>,
        contract_hash: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Record::ContractChange {
            username: username.into(),
            contract_hash: contract_hash.into(),
            details,
            timestamp: now_timestamp(),
        }
    }

    /// Open vote
    pub fn vote(issue: impl Into<String>, votes: VoteMap) -> Self {
        Record::Vote {
            issue: issue.into(),
            votes,
            closed: false,
            timestamp: now_timestamp(),
        }
    }

    /// Close marker
    pub fn vote_closed(issue: impl Into<String>) -> Self {
        Record::VoteClosed {
            issue: issue.into(),
            timestamp: now_timestamp(),
        }
    }

    /// Data access log entry
    pub fn data_access(
        accessing_user: impl Into<String>,
        target_user: impl Into<String>,
        data_key: impl Into<String>,
    ) -> Self {
        Record::DataAccess {
            accessing_user: accessing_user.into(),
            target_user: target_user.into(),
            data_key: data_key.into(),
            timestamp: now_timestamp(),
        }
    }

    /// Security event
    pub fn security_event(event: impl Into<String>) -> Self {
        Record::SecurityEvent {
            event: event.into(),
            timestamp: now_timestamp(),
        }
    }

    /// Wire tag
    pub fn kind(&self) -> &'static str {
        match self {
            Record::ContractChange { .. } => "contract_change",
            Record::Vote { .. } => "vote",
            Record::VoteClosed { .. } => "vote_closed",
            Record::DataAccess { .. } => "data_access",
            Record::SecurityEvent { .. } => "security_event",
        }
    }

    /// Issue for vote-related records
    pub fn issue(&self) -> Option<&str> {
        match self {
            Record::Vote { issue, .. } | Record::VoteClosed { issue, .. } => Some(issue),
            _ => None,
        }
    }

    /// Canonical payload string
    pub fn encode(&self) -> Result<String> {
        canonical::to_canonical_string(self)
    }

    /// Parse a payload; `None` for the genesis marker or raw payloads
    pub fn decode(payload: &str) -> Option<Self> {
        serde_json::from_str(payload).ok()
    }
}

/// Record together with the block that carries it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEntry {
    /// Block index
    pub index: u64,
    /// Block timestamp
    pub timestamp: String,
    /// Decoded record
    pub record: Record,
}

/// Decode every record in chain order, skipping raw payloads
pub fn decode_all<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Vec<RecordEntry> {
    blocks
        .into_iter()
        .filter_map(|block| {
            Record::decode(&block.payload).map(|record| RecordEntry {
                index: block.index,
                timestamp: block.timestamp.clone(),
                record,
            })
        })
        .collect()
}

/// Single ballot as submitted by a voting collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// Voter username
    pub voter: String,
    /// Chosen option
    pub vote: String,
}

impl Ballot {
    /// Create new ballot
    pub fn new(voter: impl Into<String>, vote: impl Into<String>) -> Self {
        Self {
            voter: voter.into(),
            vote: vote.into(),
        }
    }
}

/// Fold ballots into a vote map; a later ballot by the same voter wins
pub fn tally_ballots(ballots: impl IntoIterator<Item = Ballot>) -> VoteMap {
    ballots
        .into_iter()
        .map(|ballot| (ballot.voter, ballot.vote))
        .collect()
}

/// Current state of a vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    /// Issue
    pub issue: String,
    /// Votes from the latest snapshot
    pub votes: VoteMap,
    /// Whether the vote has been closed since that snapshot
    pub closed: bool,
    /// Block carrying the latest snapshot
    pub recorded_at: u64,
    /// Block carrying the close marker, if any
    pub closed_at: Option<u64>,
}

/// Reverse-scan for the latest vote on `issue`
///
/// The newest `Vote` record is authoritative for the votes. It is closed if
/// it carries the legacy flag or if a `VoteClosed` marker follows it.
pub fn find_vote_tally<'a, I>(blocks: I, issue: &str) -> Option<VoteTally>
where
    I: IntoIterator<Item = &'a Block>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut closed_at = None;

    for block in blocks.into_iter().rev() {
        match Record::decode(&block.payload) {
            Some(Record::VoteClosed { issue: i, .. }) if i == issue => {
                // Keep the earliest marker after the snapshot
                closed_at = Some(block.index);
            }
            Some(Record::Vote {
                issue: i,
                votes,
                closed,
                ..
            }) if i == issue => {
                return Some(VoteTally {
                    issue: i,
                    votes,
                    closed: closed || closed_at.is_some(),
                    recorded_at: block.index,
                    closed_at: closed_at.or_else(|| closed.then_some(block.index)),
                });
            }
            _ => {}
        }
    }

    None
}
