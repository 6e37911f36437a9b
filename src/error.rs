use thiserror::Error;

use crate::blockchain::Coin;

/// Errors raised while validating or applying chain data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid authority: signed by {signer}, expected {expected}")]
    InvalidAuthority { signer: String, expected: String },

    #[error("insufficient balance for {address}: has {balance}, needs {amount}")]
    InsufficientBalance {
        address: String,
        balance: Coin,
        amount: Coin,
    },

    /// Malformed or inconsistent data, typically from a peer.
    #[error("wrong data: {0}")]
    WrongData(String),

    #[error("transaction outside of time window: creation={creation}, expiry={expiry}, now={now}")]
    ExpiredOrFutureTransaction {
        creation: i64,
        expiry: i64,
        now: i64,
    },

    #[error("duplicate submission: {0}")]
    DuplicateSubmission(String),

    #[error("crypto: {0}")]
    Crypto(String),
}

impl ChainError {
    pub fn wrong_data(msg: impl Into<String>) -> Self {
        ChainError::WrongData(msg.into())
    }

    /// Whether the peer that delivered the offending data must be dropped.
    pub fn is_peer_fault(&self) -> bool {
        matches!(
            self,
            ChainError::WrongData(_)
                | ChainError::InvalidSignature
                | ChainError::InvalidAuthority { .. }
                | ChainError::Crypto(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("invalid genesis allocation entry: {0:?}")]
    InvalidAllocation(String),
}
