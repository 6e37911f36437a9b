//! Tunable chain constants and node settings, read from the environment.

use std::env;
use std::str::FromStr;

use crate::blockchain::{self, Coin};
use crate::error::ConfigError;

/// Consensus and protocol parameters. Every node of a chain must agree on them.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: String,
    /// (address, amount) credited by the genesis block.
    pub genesis_allocations: Vec<(String, Coin)>,
    pub block_mine_delay: i64,
    pub delta_step: u64,
    pub delta_max: u64,
    pub delta_up: u64,
    pub delta_down: u64,
    pub header_tr_length: u64,
    pub block_tr_length: u64,
    pub block_insert_length: usize,
    pub block_max_transactions: usize,
    pub transaction_lifetime: i64,
    pub nodes_time_shift: i64,
    pub mine_amount_threshold: Coin,
    pub miner_reward: Coin,
    pub sync_step_timeout: i64,
    pub sync_session_timeout: i64,
    pub packet_expiry_steps: u32,
    pub broadcast_echoes: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: "delta-chain".to_string(),
            genesis_allocations: Vec::new(),
            block_mine_delay: blockchain::BLOCK_MINE_DELAY,
            delta_step: blockchain::DELTA_STEP,
            delta_max: blockchain::DELTA_MAX,
            delta_up: blockchain::DELTA_UP,
            delta_down: blockchain::DELTA_DOWN,
            header_tr_length: blockchain::HEADER_TR_LENGTH,
            block_tr_length: blockchain::BLOCK_TR_LENGTH,
            block_insert_length: blockchain::BLOCK_INSERT_LENGTH,
            block_max_transactions: blockchain::BLOCK_MAX_TRANSACTIONS,
            transaction_lifetime: blockchain::TRANSACTION_LIFETIME,
            nodes_time_shift: blockchain::NODES_TIME_SHIFT,
            mine_amount_threshold: blockchain::MINE_AMOUNT_THRESHOLD,
            miner_reward: blockchain::MINER_REWARD,
            sync_step_timeout: blockchain::SYNC_STEP_TIMEOUT,
            sync_session_timeout: blockchain::SYNC_SESSION_TIMEOUT,
            packet_expiry_steps: blockchain::PACKET_EXPIRY_STEPS,
            broadcast_echoes: blockchain::BROADCAST_ECHOES,
        }
    }
}

impl ChainConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        Ok(Self {
            chain_id: lookup("CHAIN_ID").unwrap_or(d.chain_id),
            genesis_allocations: match lookup("GENESIS_ALLOCATIONS") {
                Some(raw) => parse_allocations(&raw)?,
                None => d.genesis_allocations,
            },
            block_mine_delay: parse_or(&lookup, "BLOCK_MINE_DELAY", d.block_mine_delay)?,
            delta_step: parse_or(&lookup, "DELTA_STEP", d.delta_step)?,
            delta_max: parse_or(&lookup, "DELTA_MAX", d.delta_max)?,
            delta_up: parse_or(&lookup, "DELTA_UP", d.delta_up)?,
            delta_down: parse_or(&lookup, "DELTA_DOWN", d.delta_down)?,
            header_tr_length: parse_or(&lookup, "HEADER_TR_LENGTH", d.header_tr_length)?,
            block_tr_length: parse_or(&lookup, "BLOCK_TR_LENGTH", d.block_tr_length)?,
            block_insert_length: parse_or(&lookup, "BLOCK_INSERT_LENGTH", d.block_insert_length)?,
            block_max_transactions: parse_or(
                &lookup,
                "BLOCK_MAX_TRANSACTIONS",
                d.block_max_transactions,
            )?,
            transaction_lifetime: parse_or(&lookup, "TRANSACTION_LIFETIME", d.transaction_lifetime)?,
            nodes_time_shift: parse_or(&lookup, "NODES_TIME_SHIFT", d.nodes_time_shift)?,
            mine_amount_threshold: parse_or(
                &lookup,
                "MINE_AMOUNT_THRESHOLD",
                d.mine_amount_threshold,
            )?,
            miner_reward: parse_or(&lookup, "MINER_REWARD", d.miner_reward)?,
            sync_step_timeout: parse_or(&lookup, "SYNC_STEP_TIMEOUT", d.sync_step_timeout)?,
            sync_session_timeout: parse_or(&lookup, "SYNC_SESSION_TIMEOUT", d.sync_session_timeout)?,
            packet_expiry_steps: parse_or(&lookup, "PACKET_EXPIRY_STEPS", d.packet_expiry_steps)?,
            broadcast_echoes: parse_or(&lookup, "BROADCAST_ECHOES", d.broadcast_echoes)?,
        })
    }
}

/// Process-level settings of one node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    /// Hex secp256k1 secret; a fresh key is generated when absent.
    pub private_key: Option<String>,
    pub miner: bool,
    pub tick_interval_secs: u64,
    pub sync_interval_secs: i64,
    pub cleanup_interval_secs: i64,
    pub rebroadcast_interval_secs: i64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            private_key: None,
            miner: false,
            tick_interval_secs: 1,
            sync_interval_secs: 15,
            cleanup_interval_secs: 600,
            rebroadcast_interval_secs: 300,
        }
    }
}

impl NodeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        Ok(Self {
            host: lookup("HOST").unwrap_or(d.host),
            port: parse_or(&lookup, "PORT", d.port)?,
            private_key: lookup("NODE_PRIVATE_KEY").filter(|k| !k.trim().is_empty()),
            miner: parse_or(&lookup, "MINER", d.miner)?,
            tick_interval_secs: parse_or(&lookup, "TICK_INTERVAL", d.tick_interval_secs)?,
            sync_interval_secs: parse_or(&lookup, "SYNC_INTERVAL", d.sync_interval_secs)?,
            cleanup_interval_secs: parse_or(&lookup, "CLEANUP_INTERVAL", d.cleanup_interval_secs)?,
            rebroadcast_interval_secs: parse_or(
                &lookup,
                "REBROADCAST_INTERVAL",
                d.rebroadcast_interval_secs,
            )?,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

/// `addr:amount,addr:amount`
fn parse_allocations(raw: &str) -> Result<Vec<(String, Coin)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (addr, amount) = entry
                .split_once(':')
                .ok_or_else(|| ConfigError::InvalidAllocation(entry.to_string()))?;
            let amount = amount
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidAllocation(entry.to_string()))?;
            Ok((addr.trim().to_string(), amount))
        })
        .collect()
}
