use super::model::{Action, Transfer};
use crate::blockchain::Coin;
use crate::error::{ChainError, Result};
use crate::state::Ledger;

/// Longest message a transfer may carry, in characters.
pub const TRANSFER_MESSAGE_MAX: usize = 80;

impl Action {
    /// Address that must sign a transaction carrying this action.
    pub fn owner(&self) -> &str {
        match self {
            Action::Transfer(t) => &t.from,
            Action::Role(r) => &r.node_address,
            Action::AddressInfo(a) => &a.node_address,
            Action::StatInfo(s) => &s.server_address,
        }
    }

    /// Coins moved out of the owner's account, fee excluded.
    pub fn spend(&self) -> Coin {
        match self {
            Action::Transfer(t) => t.amount,
            _ => 0,
        }
    }

    /// Shape checks that need no ledger.
    pub fn validate(&self) -> Result<()> {
        match self {
            Action::Transfer(t) => validate_transfer(t),
            Action::Role(r) => require_non_empty("role node address", &r.node_address),
            Action::AddressInfo(a) => {
                require_non_empty("node address", &a.node_address)?;
                require_non_empty("ip address", &a.ip_address)
            }
            Action::StatInfo(s) => {
                require_non_empty("server address", &s.server_address)?;
                if s.items.is_empty() {
                    return Err(ChainError::wrong_data("stat info without items"));
                }
                if let Some(item) = s.items.iter().find(|i| i.count == 0) {
                    return Err(ChainError::wrong_data(format!(
                        "stat info with zero count for {}",
                        item.peer_address
                    )));
                }
                Ok(())
            }
        }
    }

    /// Whether the owner can pay `fee` plus the spend, and the action fits
    /// the current ledger.
    pub fn can_apply(&self, ledger: &Ledger, fee: Coin) -> Result<()> {
        let owner = self.owner();
        let cost = fee
            .checked_add(self.spend())
            .ok_or_else(|| ChainError::wrong_data("transaction cost overflow"))?;
        let balance = ledger.get_balance(owner);
        if balance < cost {
            return Err(ChainError::InsufficientBalance {
                address: owner.to_string(),
                balance,
                amount: cost,
            });
        }
        if let Action::Role(r) = self {
            if ledger.get_role(&r.node_address).is_some() {
                return Err(ChainError::wrong_data(format!(
                    "node {} already has a role",
                    r.node_address
                )));
            }
        }
        Ok(())
    }

    /// Ledger effect of the action, fee excluded.
    pub fn apply(&self, ledger: &mut Ledger) -> Result<()> {
        match self {
            Action::Transfer(t) => {
                ledger.decrease_balance(&t.from, t.amount)?;
                ledger.increase_balance(&t.to, t.amount)
            }
            Action::Role(r) => ledger.insert_role(&r.node_address, r.node_type),
            Action::AddressInfo(_) | Action::StatInfo(_) => Ok(()),
        }
    }

    /// Exact inverse of [`Action::apply`].
    pub fn revert(&self, ledger: &mut Ledger) -> Result<()> {
        match self {
            Action::Transfer(t) => {
                ledger.decrease_balance(&t.to, t.amount)?;
                ledger.increase_balance(&t.from, t.amount)
            }
            Action::Role(r) => {
                ledger.remove_role(&r.node_address);
                Ok(())
            }
            Action::AddressInfo(_) | Action::StatInfo(_) => Ok(()),
        }
    }
}

fn validate_transfer(t: &Transfer) -> Result<()> {
    require_non_empty("sender", &t.from)?;
    require_non_empty("receiver", &t.to)?;
    if t.amount == 0 {
        return Err(ChainError::wrong_data("transfer of zero coins"));
    }
    if t.message.chars().count() > TRANSFER_MESSAGE_MAX {
        return Err(ChainError::wrong_data(format!(
            "transfer message longer than {TRANSFER_MESSAGE_MAX} characters"
        )));
    }
    Ok(())
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ChainError::wrong_data(format!("empty {what}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{NodeType, Role, StatInfo, StatItem};

    fn transfer(amount: Coin) -> Action {
        Action::Transfer(Transfer {
            from: "a".into(),
            to: "b".into(),
            amount,
            message: "rent".into(),
        })
    }

    #[test]
    fn transfer_shape() {
        assert!(transfer(1).validate().is_ok());
        assert!(transfer(0).validate().is_err());

        let long = Action::Transfer(Transfer {
            from: "a".into(),
            to: "b".into(),
            amount: 1,
            message: "x".repeat(81),
        });
        assert!(long.validate().is_err());
    }

    #[test]
    fn stat_info_needs_counters() {
        let stat = |count| {
            Action::StatInfo(StatInfo {
                server_address: "s".into(),
                items: vec![StatItem {
                    peer_address: "p".into(),
                    count,
                }],
            })
        };
        assert!(stat(3).validate().is_ok());
        assert!(stat(0).validate().is_err());
    }

    #[test]
    fn can_apply_counts_fee_and_amount() {
        let mut ledger = Ledger::new();
        ledger.increase_balance("a", 41).unwrap();
        assert!(transfer(40).can_apply(&ledger, 1).is_ok());
        assert!(matches!(
            transfer(40).can_apply(&ledger, 2),
            Err(ChainError::InsufficientBalance { amount: 42, .. })
        ));
    }

    #[test]
    fn apply_then_revert_is_identity() {
        let mut ledger = Ledger::new();
        ledger.increase_balance("a", 100).unwrap();
        let action = transfer(40);
        action.apply(&mut ledger).unwrap();
        assert_eq!(ledger.get_balance("b"), 40);
        action.revert(&mut ledger).unwrap();
        assert_eq!(ledger.get_balance("a"), 100);
        assert!(!ledger.has_account("b"));
    }

    #[test]
    fn role_is_unique_per_node() {
        let mut ledger = Ledger::new();
        ledger.increase_balance("n", 5).unwrap();
        let role = Action::Role(Role {
            node_address: "n".into(),
            node_type: NodeType::Channel,
        });
        role.apply(&mut ledger).unwrap();
        assert!(role.can_apply(&ledger, 0).is_err());
        role.revert(&mut ledger).unwrap();
        assert!(role.can_apply(&ledger, 0).is_ok());
    }
}
