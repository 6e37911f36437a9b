use crate::blockchain::{Block, Reward, RewardType};
use crate::config::ChainConfig;
use crate::error::{ChainError, Result};
use crate::transaction::SignedTransaction;

/// Mandatory reward set of a non-genesis block: the miner reward plus every
/// fee, paid to the block authority.
pub fn grant_rewards(
    transactions: &[SignedTransaction],
    authority: &str,
    config: &ChainConfig,
) -> Result<Vec<Reward>> {
    let amount = transactions
        .iter()
        .try_fold(config.miner_reward, |acc, t| acc.checked_add(t.fee()))
        .ok_or_else(|| ChainError::wrong_data("reward overflow"))?;
    if amount == 0 {
        return Ok(Vec::new());
    }
    Ok(vec![Reward {
        to: authority.to_string(),
        amount,
        reward_type: RewardType::Miner,
    }])
}

/// The rewards claimed by `block` must equal the recomputed set exactly.
pub fn check_rewards(block: &Block, authority: &str, config: &ChainConfig) -> Result<()> {
    let expected = grant_rewards(&block.signed_transactions, authority, config)?;
    if block.rewards != expected {
        return Err(ChainError::wrong_data(format!(
            "block {}: claimed rewards do not match the mandatory set",
            block.header.block_number
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::BlockHeader;
    use crate::transaction::{Action, Transaction, Transfer};
    use crate::wallet::KeyPair;

    fn with_fee(keys: &KeyPair, fee: u64) -> SignedTransaction {
        SignedTransaction::sign(
            Transaction {
                action: Action::Transfer(Transfer {
                    from: keys.address().to_string(),
                    to: "b".into(),
                    amount: 1,
                    message: String::new(),
                }),
                fee,
                creation: 0,
                expiry: 10,
            },
            keys,
        )
    }

    #[test]
    fn fees_go_to_authority() {
        let keys = KeyPair::generate();
        let config = ChainConfig::default();
        let txs = vec![with_fee(&keys, 2), with_fee(&keys, 3)];
        let rewards = grant_rewards(&txs, "miner", &config).unwrap();
        assert_eq!(
            rewards,
            vec![Reward {
                to: "miner".into(),
                amount: config.miner_reward + 5,
                reward_type: RewardType::Miner,
            }]
        );
    }

    #[test]
    fn nothing_to_grant_yields_empty_set() {
        let config = ChainConfig {
            miner_reward: 0,
            ..ChainConfig::default()
        };
        assert!(grant_rewards(&[], "miner", &config).unwrap().is_empty());
    }

    #[test]
    fn inflated_claim_is_rejected() {
        let config = ChainConfig::default();
        let mut block = Block {
            header: BlockHeader {
                block_number: 1,
                delta: 1,
                c_sum: 1,
                c_const: 1,
                prev_hash: String::new(),
                time_signed: 60,
            },
            signed_transactions: Vec::new(),
            rewards: grant_rewards(&[], "miner", &config).unwrap(),
        };
        assert!(check_rewards(&block, "miner", &config).is_ok());
        assert!(check_rewards(&block, "thief", &config).is_err());

        block.rewards[0].amount += 1;
        assert!(check_rewards(&block, "miner", &config).is_err());
    }
}
