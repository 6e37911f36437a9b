use serde::{Deserialize, Serialize};

use crate::blockchain::{Coin, Reward};
use crate::storage::{StagedLog, Transactional};
use crate::transaction::Action;

/// One ledger-affecting operation, as recorded in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoggedAction {
    Transaction {
        hash: String,
        signer: String,
        fee: Coin,
        action: Action,
    },
    Reward(Reward),
}

/// Append-only audit trail with stack-only revert.
#[derive(Debug, Default)]
pub struct ActionLog {
    entries: StagedLog<LoggedAction>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, entry: LoggedAction) {
        self.entries.push(entry);
    }

    /// Remove the most recent entry. Reverting an empty log is a bug.
    pub fn revert(&mut self) -> LoggedAction {
        self.entries
            .pop()
            .unwrap_or_else(|| panic!("unable to revert an empty action log"))
    }

    pub fn length(&self) -> usize {
        self.entries.len()
    }

    pub fn last(&self) -> Option<&LoggedAction> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoggedAction> {
        self.entries.iter()
    }
}

impl Transactional for ActionLog {
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
