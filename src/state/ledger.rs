use log::debug;

use crate::blockchain::Coin;
use crate::error::{ChainError, Result};
use crate::storage::{StagedMap, Transactional};
use crate::transaction::NodeType;

/// Account balances plus the node role table.
///
/// Balances are sparse: an absent address has zero coins, and an account
/// reaching zero is removed.
#[derive(Debug, Default)]
pub struct Ledger {
    balances: StagedMap<String, Coin>,
    roles: StagedMap<String, NodeType>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_balance(&self, address: &str) -> Coin {
        self.balances.get(&address.to_string()).copied().unwrap_or(0)
    }

    pub fn has_account(&self, address: &str) -> bool {
        self.balances.contains(&address.to_string())
    }

    pub fn increase_balance(&mut self, address: &str, amount: Coin) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.get_balance(address);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| ChainError::wrong_data(format!("balance overflow for {address}")))?;
        self.balances.insert(address.to_string(), updated);
        Ok(())
    }

    pub fn decrease_balance(&mut self, address: &str, amount: Coin) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.get_balance(address);
        if balance < amount {
            return Err(ChainError::InsufficientBalance {
                address: address.to_string(),
                balance,
                amount,
            });
        }
        if balance == amount {
            self.balances.remove(&address.to_string());
        } else {
            self.balances.insert(address.to_string(), balance - amount);
        }
        Ok(())
    }

    /// Every account with a non-zero balance, unordered.
    pub fn accounts(&self) -> Vec<(String, Coin)> {
        self.balances
            .iter()
            .map(|(address, amount)| (address.clone(), *amount))
            .collect()
    }

    pub fn get_role(&self, node_address: &str) -> Option<NodeType> {
        self.roles.get(&node_address.to_string()).copied()
    }

    pub fn insert_role(&mut self, node_address: &str, node_type: NodeType) -> Result<()> {
        if let Some(existing) = self.get_role(node_address) {
            return Err(ChainError::wrong_data(format!(
                "node {node_address} already has role {existing:?}"
            )));
        }
        debug!("LEDGER role {node_type:?} assigned to {node_address}");
        self.roles.insert(node_address.to_string(), node_type);
        Ok(())
    }

    pub fn remove_role(&mut self, node_address: &str) -> Option<NodeType> {
        self.roles.remove(&node_address.to_string())
    }
}

impl Transactional for Ledger {
    fn save(&mut self) {
        self.balances.save();
        self.roles.save();
    }

    fn commit(&mut self) {
        self.balances.commit();
        self.roles.commit();
    }

    fn discard(&mut self) {
        self.balances.discard();
        self.roles.discard();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_account_has_zero_balance() {
        let ledger = Ledger::new();
        assert_eq!(ledger.get_balance("nobody"), 0);
        assert!(!ledger.has_account("nobody"));
    }

    #[test]
    fn decrease_to_zero_removes_entry() {
        let mut ledger = Ledger::new();
        ledger.increase_balance("a", 10).unwrap();
        ledger.decrease_balance("a", 10).unwrap();
        assert!(!ledger.has_account("a"));
        assert!(ledger.accounts().is_empty());
    }

    #[test]
    fn zero_amounts_are_noops() {
        let mut ledger = Ledger::new();
        ledger.increase_balance("a", 0).unwrap();
        ledger.decrease_balance("a", 0).unwrap();
        assert!(!ledger.has_account("a"));
    }

    #[test]
    fn insufficient_balance_leaves_state_untouched() {
        let mut ledger = Ledger::new();
        ledger.increase_balance("a", 5).unwrap();
        let err = ledger.decrease_balance("a", 6).unwrap_err();
        assert_eq!(
            err,
            ChainError::InsufficientBalance {
                address: "a".into(),
                balance: 5,
                amount: 6
            }
        );
        assert_eq!(ledger.get_balance("a"), 5);
    }

    #[test]
    fn discard_reverts_to_last_commit() {
        let mut ledger = Ledger::new();
        ledger.increase_balance("a", 100).unwrap();
        ledger.save();
        ledger.commit();

        ledger.decrease_balance("a", 40).unwrap();
        ledger.increase_balance("b", 40).unwrap();
        ledger.insert_role("a", NodeType::Channel).unwrap();
        ledger.discard();

        assert_eq!(ledger.get_balance("a"), 100);
        assert_eq!(ledger.get_balance("b"), 0);
        assert_eq!(ledger.get_role("a"), None);
    }

    #[test]
    fn one_role_per_node() {
        let mut ledger = Ledger::new();
        ledger.insert_role("n", NodeType::Storage).unwrap();
        assert!(ledger.insert_role("n", NodeType::Channel).is_err());
        assert_eq!(ledger.remove_role("n"), Some(NodeType::Storage));
        assert!(ledger.insert_role("n", NodeType::Channel).is_ok());
    }
}
