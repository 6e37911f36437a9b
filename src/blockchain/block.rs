use serde::{Deserialize, Serialize};

use super::Coin;
use crate::error::Result;
use crate::transaction::SignedTransaction;
use crate::wallet::{KeyPair, check_signature, hash_hex};

/// Consensus-relevant summary of a block, exchanged during header sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub block_number: u64,
    /// Consensus weight contributed by this block.
    pub delta: u64,
    /// Sum of all deltas since genesis.
    pub c_sum: u64,
    /// Difficulty constant in effect for the child of this block.
    pub c_const: u64,
    /// Hash of the previous block body.
    pub prev_hash: String,
    pub time_signed: i64, // Unix timestamp (UTC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    Initial,
    Miner,
    Channel,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub to: String,
    pub amount: Coin,
    pub reward_type: RewardType,
}

/// Block body: header, transactions in creation order, and the mandatory rewards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub signed_transactions: Vec<SignedTransaction>,
    pub rewards: Vec<Reward>,
}

impl Block {
    /// Genesis block shared by every node of a chain. Only the initial
    /// allocations are credited, through `Initial` rewards.
    pub fn genesis(chain_id: &str, allocations: &[(String, Coin)]) -> Self {
        Self {
            header: BlockHeader {
                block_number: 0,
                delta: 0,
                c_sum: 0,
                c_const: 1,
                prev_hash: hash_hex(chain_id.as_bytes()),
                time_signed: 0,
            },
            signed_transactions: Vec::new(),
            rewards: allocations
                .iter()
                .filter(|(_, amount)| *amount > 0)
                .map(|(to, amount)| Reward {
                    to: to.clone(),
                    amount: *amount,
                    reward_type: RewardType::Initial,
                })
                .collect(),
        }
    }

    /// Canonical bytes: deterministic JSON of the body.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("serialize block")
    }

    /// SHA-256 of the canonical bytes; referenced by the child's `prev_hash`.
    pub fn compute_hash(&self) -> String {
        hash_hex(&self.canonical_bytes())
    }
}

/// A block body plus the miner's signature over its canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub authority: String,
    pub signature: String,
    pub block: Block,
}

impl SignedBlock {
    pub fn sign(block: Block, keys: &KeyPair) -> Self {
        let signature = keys.sign(&block.canonical_bytes());
        Self {
            authority: keys.address().to_string(),
            signature,
            block,
        }
    }

    /// Genesis carries no authority; it is rebuilt locally, never received.
    pub fn unsigned(block: Block) -> Self {
        Self {
            authority: String::new(),
            signature: String::new(),
            block,
        }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.block.header
    }

    pub fn verify_signature(&self) -> Result<()> {
        check_signature(&self.authority, &self.signature, &self.block.canonical_bytes())
    }
}
