//! In-memory block store
//!
//! Ordered, append-only sequence of sealed blocks. The chain never hands out
//! mutable access to stored blocks; the only way in is [`Chain::push`],
//! which accepts a block only if it extends the current tail.
//!
//! Appending is split into two phases so the expensive seal search can run
//! without holding any lock:
//!
//! ```text
//! chain.candidate(payload)  ── read tail (index, proof, digest)
//!        │
//!        ▼
//! candidate.seal(&sealer)   ── brute force, no lock held
//!        │
//!        ▼
//! chain.push(block)         ── re-checks the link under the write lock
//! ```

use crate::{
    pow::Sealer,
    types::{now_timestamp, Block},
    Error, Result,
};

/// Block store
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// Create a chain holding only the genesis block
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
        }
    }

    /// Restore a chain from blocks supplied by a persistence collaborator
    ///
    /// Blocks are taken as-is; run the validator to check them.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        if blocks.is_empty() {
            return Err(Error::BlockRejected(
                "Cannot restore an empty chain".to_string(),
            ));
        }
        Ok(Self { blocks })
    }

    /// Number of blocks, genesis included
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: a chain holds at least its genesis block
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Most recently appended block
    pub fn tail(&self) -> &Block {
        self.blocks.last().expect("chain always holds a genesis block")
    }

    /// Root block
    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    /// Block at `index`
    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    /// All blocks in chain order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Iterate in chain order (`.rev()` for newest first)
    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Capture everything needed to seal the next block
    pub fn candidate(&self, payload: impl Into<String>) -> Candidate {
        let tail = self.tail();
        Candidate {
            index: self.blocks.len() as u64,
            previous_proof: tail.proof,
            previous_hash: tail.digest(),
            payload: payload.into(),
        }
    }

    /// Append a sealed block that extends the current tail
    pub fn push(&mut self, block: Block) -> Result<()> {
        let expected_index = self.blocks.len() as u64;
        if block.index != expected_index {
            return Err(Error::BlockRejected(format!(
                "Expected index {}, got {}",
                expected_index, block.index
            )));
        }

        let tail_digest = self.tail().digest();
        if block.previous_hash != tail_digest {
            return Err(Error::BlockRejected(format!(
                "Block {} does not link to the current tail",
                block.index
            )));
        }

        self.blocks.push(block);
        Ok(())
    }

    /// Seal and append in one step (synchronous path)
    pub fn append(&mut self, payload: impl Into<String>, sealer: &Sealer) -> Result<Block> {
        let (block, _attempts) = self.candidate(payload).seal(sealer)?;
        self.push(block.clone())?;
        Ok(block)
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

/// Unsealed next block, chained to a snapshot of the tail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Index the block will occupy
    pub index: u64,
    /// Proof of the tail it extends
    pub previous_proof: u64,
    /// Digest of the tail it extends
    pub previous_hash: String,
    /// Record payload
    pub payload: String,
}

impl Candidate {
    /// Run the seal search; returns the block and the attempts spent
    pub fn seal(self, sealer: &Sealer) -> Result<(Block, u64)> {
        let seal = sealer.seal(self.previous_proof, self.index, &self.payload)?;

        let block = Block {
            index: self.index,
            timestamp: now_timestamp(),
            payload: self.payload,
            proof: seal.proof,
            previous_hash: self.previous_hash,
        };

        Ok((block, seal.attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::verify_seal;

    #[test]
    fn test_new_chain_has_genesis() {
        let chain = Chain::new();
        assert_eq!(chain.len(), 1);
        assert!(!chain.is_empty());
        assert_eq!(chain.tail(), chain.genesis());
        assert_eq!(chain.genesis().payload, "Genesis Block");
    }

    #[test]
    fn test_append_links_and_seals() {
        let sealer = Sealer::new(2);
        let mut chain = Chain::new();
        let genesis = chain.genesis().clone();

        let block = chain.append("first", &sealer).unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, genesis.digest());
        assert!(verify_seal(block.proof, genesis.proof, 1, "first", 2));
        assert_eq!(chain.tail(), &block);
    }

    #[test]
    fn test_sequential_indices() {
        let sealer = Sealer::new(1);
        let mut chain = Chain::new();
        for i in 0..10 {
            chain.append(format!("record {}", i), &sealer).unwrap();
        }

        assert_eq!(chain.len(), 11);
        for (position, block) in chain.iter().enumerate() {
            assert_eq!(block.index, position as u64);
        }
        assert_eq!(chain.get(10).unwrap().payload, "record 9");
        assert!(chain.get(11).is_none());
    }

    #[test]
    fn test_push_rejects_stale_candidate() {
        let sealer = Sealer::new(1);
        let mut chain = Chain::new();

        // Two candidates against the same tail: only the first may land
        let first = chain.candidate("a").seal(&sealer).unwrap().0;
        let second = chain.candidate("b").seal(&sealer).unwrap().0;

        chain.push(first).unwrap();
        let result = chain.push(second);
        assert!(matches!(result, Err(Error::BlockRejected(_))));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_push_rejects_wrong_link() {
        let sealer = Sealer::new(1);
        let mut chain = Chain::new();
        let (mut block, _) = chain.candidate("a").seal(&sealer).unwrap();
        block.previous_hash = "deadbeef".to_string();

        assert!(matches!(chain.push(block), Err(Error::BlockRejected(_))));
    }

    #[test]
    fn test_from_blocks() {
        assert!(Chain::from_blocks(vec![]).is_err());

        let sealer = Sealer::new(1);
        let mut chain = Chain::new();
        chain.append("a", &sealer).unwrap();

        let restored = Chain::from_blocks(chain.blocks().to_vec()).unwrap();
        assert_eq!(restored.blocks(), chain.blocks());
    }
}
