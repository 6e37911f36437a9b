use super::SignedTransaction;
use crate::config::ChainConfig;
use crate::error::{ChainError, Result};

/// Signature, signer and shape checks shared by pool admission and block
/// validation.
pub fn check_signed_transaction(transaction: &SignedTransaction) -> Result<()> {
    transaction.verify_signature()?;
    let owner = transaction.action().owner();
    if transaction.authority != owner {
        return Err(ChainError::InvalidAuthority {
            signer: transaction.authority.clone(),
            expected: owner.to_string(),
        });
    }
    transaction.action().validate()
}

/// Time window for admission against the local clock, tolerating
/// `nodes_time_shift` of skew in either direction.
pub fn check_admission_window(
    transaction: &SignedTransaction,
    now: i64,
    config: &ChainConfig,
) -> Result<()> {
    let creation = transaction.creation();
    let expiry = transaction.expiry();
    let out_of_window = creation > now + config.nodes_time_shift
        || expiry < now - config.nodes_time_shift
        || !within_lifetime(creation, expiry, config);
    if out_of_window {
        return Err(ChainError::ExpiredOrFutureTransaction {
            creation,
            expiry,
            now,
        });
    }
    Ok(())
}

/// A transaction may only be sealed into a block signed while it was live,
/// and only if its lifetime fits the cache horizon. A longer-lived one would
/// outlive its cache entry and could be sealed again.
pub fn check_block_window(
    transaction: &SignedTransaction,
    time_signed: i64,
    config: &ChainConfig,
) -> Result<()> {
    let creation = transaction.creation();
    let expiry = transaction.expiry();
    if !within_lifetime(creation, expiry, config) {
        return Err(ChainError::wrong_data(format!(
            "transaction {} lives {creation}..{expiry}, over the {}s lifetime",
            transaction.hash(),
            config.transaction_lifetime
        )));
    }
    if creation > time_signed || expiry < time_signed {
        return Err(ChainError::wrong_data(format!(
            "transaction {} not live at block time {time_signed}",
            transaction.hash()
        )));
    }
    Ok(())
}

fn within_lifetime(creation: i64, expiry: i64, config: &ChainConfig) -> bool {
    expiry >= creation && expiry.saturating_sub(creation) <= config.transaction_lifetime
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Action, Transaction, Transfer};
    use crate::wallet::KeyPair;

    fn signed(keys: &KeyPair, from: &str, creation: i64, expiry: i64) -> SignedTransaction {
        SignedTransaction::sign(
            Transaction {
                action: Action::Transfer(Transfer {
                    from: from.to_string(),
                    to: "b".into(),
                    amount: 1,
                    message: String::new(),
                }),
                fee: 0,
                creation,
                expiry,
            },
            keys,
        )
    }

    #[test]
    fn authority_must_own_action() {
        let keys = KeyPair::generate();
        let own = signed(&keys, keys.address(), 0, 10);
        assert!(check_signed_transaction(&own).is_ok());

        let foreign = signed(&keys, "someone-else", 0, 10);
        assert!(matches!(
            check_signed_transaction(&foreign),
            Err(ChainError::InvalidAuthority { .. })
        ));
    }

    #[test]
    fn admission_window_edges() {
        let config = ChainConfig::default();
        let keys = KeyPair::generate();
        let now = 10_000;
        let shift = config.nodes_time_shift;

        let ok = signed(&keys, keys.address(), now + shift, now + 600);
        assert!(check_admission_window(&ok, now, &config).is_ok());

        let future = signed(&keys, keys.address(), now + shift + 1, now + 600);
        assert!(check_admission_window(&future, now, &config).is_err());

        let expired = signed(&keys, keys.address(), now - 600, now - shift - 1);
        assert!(check_admission_window(&expired, now, &config).is_err());

        let too_long = signed(
            &keys,
            keys.address(),
            now,
            now + config.transaction_lifetime + 1,
        );
        assert!(check_admission_window(&too_long, now, &config).is_err());
    }

    #[test]
    fn admission_survives_extreme_timestamps() {
        let config = ChainConfig::default();
        let keys = KeyPair::generate();
        let wide = signed(&keys, keys.address(), i64::MIN, i64::MAX);
        assert!(check_admission_window(&wide, 0, &config).is_err());
    }

    #[test]
    fn block_window() {
        let config = ChainConfig::default();
        let keys = KeyPair::generate();
        let t = signed(&keys, keys.address(), 100, 200);
        assert!(check_block_window(&t, 100, &config).is_ok());
        assert!(check_block_window(&t, 200, &config).is_ok());
        assert!(check_block_window(&t, 99, &config).is_err());
        assert!(check_block_window(&t, 201, &config).is_err());
    }

    #[test]
    fn block_window_enforces_lifetime() {
        let config = ChainConfig {
            transaction_lifetime: 100,
            ..ChainConfig::default()
        };
        let keys = KeyPair::generate();

        let longest = signed(&keys, keys.address(), 5, 105);
        assert!(check_block_window(&longest, 50, &config).is_ok());

        let long_lived = signed(&keys, keys.address(), 5, 1_000_000);
        assert!(matches!(
            check_block_window(&long_lived, 50, &config),
            Err(ChainError::WrongData(_))
        ));

        let inverted = signed(&keys, keys.address(), 50, 40);
        assert!(check_block_window(&inverted, 45, &config).is_err());

        let extreme = signed(&keys, keys.address(), i64::MIN, i64::MAX);
        assert!(check_block_window(&extreme, 0, &config).is_err());
    }
}
