use log::debug;

use super::SignedTransaction;
use crate::error::{ChainError, Result};
use crate::storage::{StagedMap, Transactional};

#[derive(Debug, Clone)]
struct PoolEntry {
    // admission order; pool effects are applied in this order
    seq: u64,
    transaction: SignedTransaction,
}

/// Signed transactions waiting for a block, keyed by transaction hash.
#[derive(Debug, Default)]
pub struct TransactionPool {
    entries: StagedMap<String, PoolEntry>,
    next_seq: u64,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under the transaction's hash. A hash already present is a
    /// duplicate submission.
    pub fn insert(&mut self, transaction: SignedTransaction) -> Result<String> {
        let hash = transaction.hash();
        if self.entries.contains(&hash) {
            return Err(ChainError::DuplicateSubmission(hash));
        }
        debug!("POOL insert {hash}");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .insert(hash.clone(), PoolEntry { seq, transaction });
        Ok(hash)
    }

    pub fn remove(&mut self, hash: &str) -> Option<SignedTransaction> {
        self.entries
            .remove(&hash.to_string())
            .map(|entry| entry.transaction)
    }

    pub fn get(&self, hash: &str) -> Option<&SignedTransaction> {
        self.entries
            .get(&hash.to_string())
            .map(|entry| &entry.transaction)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains(&hash.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hashes in admission order.
    pub fn get_keys(&self) -> Vec<String> {
        let mut keyed: Vec<(u64, &String)> =
            self.entries.iter().map(|(k, e)| (e.seq, k)).collect();
        keyed.sort_unstable();
        keyed.into_iter().map(|(_, k)| k.clone()).collect()
    }

    /// Transactions in admission order.
    pub fn in_admission_order(&self) -> Vec<(String, SignedTransaction)> {
        let mut entries: Vec<(&String, &PoolEntry)> = self.entries.iter().collect();
        entries.sort_unstable_by_key(|(_, e)| e.seq);
        entries
            .into_iter()
            .map(|(k, e)| (k.clone(), e.transaction.clone()))
            .collect()
    }

    /// Transactions ordered by creation time, ties broken by admission order.
    /// Used for block assembly.
    pub fn by_creation(&self) -> Vec<(String, SignedTransaction)> {
        let mut entries: Vec<(&String, &PoolEntry)> = self.entries.iter().collect();
        entries.sort_unstable_by_key(|(_, e)| (e.transaction.creation(), e.seq));
        entries
            .into_iter()
            .map(|(k, e)| (k.clone(), e.transaction.clone()))
            .collect()
    }
}

impl Transactional for TransactionPool {
    fn save(&mut self) {
        self.entries.save();
    }

    fn commit(&mut self) {
        self.entries.commit();
    }

    fn discard(&mut self) {
        // seq keeps growing; only relative order matters
        self.entries.discard();
    }
}
