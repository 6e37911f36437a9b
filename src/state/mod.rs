//! Ledger and audit trail, mutated in lockstep: every ledger change made
//! here is paired with one action log entry, and reverts pop that entry.

pub mod action_log;
pub mod ledger;

pub use action_log::{ActionLog, LoggedAction};
pub use ledger::Ledger;

use crate::blockchain::Reward;
use crate::error::Result;
use crate::transaction::SignedTransaction;

/// Charge the fee, apply the action and log it. Nothing is mutated when
/// the transaction cannot be applied.
pub fn apply_transaction(
    ledger: &mut Ledger,
    log: &mut ActionLog,
    transaction: &SignedTransaction,
) -> Result<()> {
    let action = transaction.action();
    action.can_apply(ledger, transaction.fee())?;
    ledger.decrease_balance(action.owner(), transaction.fee())?;
    action.apply(ledger)?;
    log.log(LoggedAction::Transaction {
        hash: transaction.hash(),
        signer: transaction.authority.clone(),
        fee: transaction.fee(),
        action: action.clone(),
    });
    Ok(())
}

/// Undo [`apply_transaction`]. The transaction must be the last logged entry.
pub fn revert_transaction(
    ledger: &mut Ledger,
    log: &mut ActionLog,
    transaction: &SignedTransaction,
) -> Result<()> {
    let hash = transaction.hash();
    match log.revert() {
        LoggedAction::Transaction { hash: logged, .. } if logged == hash => {}
        other => panic!("action log out of order: expected transaction {hash}, found {other:?}"),
    }
    let action = transaction.action();
    action.revert(ledger)?;
    ledger.increase_balance(action.owner(), transaction.fee())
}

pub fn apply_reward(ledger: &mut Ledger, log: &mut ActionLog, reward: &Reward) -> Result<()> {
    ledger.increase_balance(&reward.to, reward.amount)?;
    log.log(LoggedAction::Reward(reward.clone()));
    Ok(())
}

/// Undo [`apply_reward`]. The reward must be the last logged entry.
pub fn revert_reward(ledger: &mut Ledger, log: &mut ActionLog, reward: &Reward) -> Result<()> {
    match log.revert() {
        LoggedAction::Reward(logged) if &logged == reward => {}
        other => panic!("action log out of order: expected reward {reward:?}, found {other:?}"),
    }
    ledger.decrease_balance(&reward.to, reward.amount)
}
