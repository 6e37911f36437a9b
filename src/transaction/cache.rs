use log::debug;

use crate::storage::{StagedMap, Transactional};

/// Hashes of transactions sealed into blocks, mapped to their creation
/// time. Guards against replay for as long as a transaction could still be
/// accepted.
#[derive(Debug, Default)]
pub struct TransactionCache {
    entries: StagedMap<String, i64>,
}

impl TransactionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hash: String, creation: i64) {
        self.entries.insert(hash, creation);
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains(&hash.to_string())
    }

    pub fn remove(&mut self, hash: &str) -> Option<i64> {
        self.entries.remove(&hash.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict entries whose transaction can no longer be resubmitted:
    /// `creation + lifetime < now`. Returns how many were evicted.
    pub fn cleanup(&mut self, now: i64, lifetime: i64) -> usize {
        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, creation)| creation.saturating_add(lifetime) < now)
            .map(|(hash, _)| hash.clone())
            .collect();
        for hash in &stale {
            self.entries.remove(hash);
        }
        if !stale.is_empty() {
            debug!("POOL cache evicted {} entries", stale.len());
        }
        stale.len()
    }
}

impl Transactional for TransactionCache {
    fn save(&mut self) {
        self.entries.save();
    }

    fn commit(&mut self) {
        self.entries.commit();
    }

    fn discard(&mut self) {
        self.entries.discard();
    }
}
