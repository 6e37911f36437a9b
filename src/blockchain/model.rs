use super::{BlockHeader, SignedBlock};
use crate::storage::{StagedLog, Transactional};

/// Append-only chain of signed blocks indexed by block number, with a
/// parallel index of block hashes.
#[derive(Debug)]
pub struct Blockchain {
    blocks: StagedLog<SignedBlock>,
    hashes: StagedLog<String>,
}

impl Blockchain {
    /// Initialize a new blockchain with a committed genesis block.
    pub fn new(genesis: SignedBlock) -> Self {
        let mut bc = Self {
            blocks: StagedLog::new(),
            hashes: StagedLog::new(),
        };
        bc.insert(genesis);
        bc.save();
        bc.commit();
        bc
    }

    pub fn length(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn at(&self, number: u64) -> Option<&SignedBlock> {
        self.blocks.get(number as usize)
    }

    pub fn header_at(&self, number: u64) -> Option<&BlockHeader> {
        self.at(number).map(SignedBlock::header)
    }

    pub fn hash_at(&self, number: u64) -> Option<&str> {
        self.hashes.get(number as usize).map(String::as_str)
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &SignedBlock {
        self.blocks
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    pub fn last_header(&self) -> &BlockHeader {
        self.last_block().header()
    }

    pub fn last_hash(&self) -> &str {
        self.hashes
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    /// Append a block. Its number must equal the current length.
    pub fn insert(&mut self, signed_block: SignedBlock) {
        let number = signed_block.header().block_number;
        assert_eq!(
            number,
            self.length(),
            "wrong block is going to be inserted: number {number}"
        );
        self.hashes.push(signed_block.block.compute_hash());
        self.blocks.push(signed_block);
    }

    /// Pop the head block. Genesis can never be removed.
    pub fn remove_last_block(&mut self) -> SignedBlock {
        assert!(self.length() > 1, "unable to remove genesis block");
        self.hashes.pop();
        self.blocks
            .pop()
            .expect("Blockchain should always have at least the genesis block")
    }

    /// Every header walking back from the head.
    pub fn headers_back(&self) -> impl Iterator<Item = &BlockHeader> {
        self.blocks.iter().rev().map(SignedBlock::header)
    }

    /// Headers from `from` down to `to` inclusive, newest first, at most `limit`.
    pub fn headers_desc(&self, from: u64, to: u64, limit: u64) -> Vec<BlockHeader> {
        let from = from.min(self.length() - 1);
        let to = to.min(from).max(from.saturating_sub(limit.saturating_sub(1)));
        (to..=from)
            .rev()
            .filter_map(|n| self.header_at(n).cloned())
            .collect()
    }

    /// Blocks from `from` up to `to` inclusive, oldest first, at most `limit`.
    pub fn blocks_asc(&self, from: u64, to: u64, limit: u64) -> Vec<SignedBlock> {
        let last = self.length() - 1;
        if from > last || limit == 0 {
            return Vec::new();
        }
        let to = to.max(from).min(last).min(from + limit - 1);
        (from..=to).filter_map(|n| self.at(n).cloned()).collect()
    }
}

impl Transactional for Blockchain {
    fn save(&mut self) {
        self.blocks.save();
        self.hashes.save();
    }

    fn commit(&mut self) {
        self.blocks.commit();
        self.hashes.commit();
    }

    fn discard(&mut self) {
        self.blocks.discard();
        self.hashes.discard();
    }
}
