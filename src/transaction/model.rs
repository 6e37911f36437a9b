use serde::{Deserialize, Serialize};

use crate::blockchain::Coin;
use crate::error::Result;
use crate::wallet::{KeyPair, check_signature, hash_hex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: Coin,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Blockchain,
    Channel,
    Storage,
}

/// Declares the role a node plays in the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub node_address: String,
    pub node_type: NodeType,
}

/// Publishes the reachable address of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub node_address: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatItem {
    pub peer_address: String,
    pub count: u64,
}

/// Service statistics reported by a server node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatInfo {
    pub server_address: String,
    pub items: Vec<StatItem>,
}

/// What a transaction does. Only `Transfer` moves balances; `Role` also
/// touches the ledger role table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Transfer(Transfer),
    Role(Role),
    AddressInfo(AddressInfo),
    StatInfo(StatInfo),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub action: Action,
    pub fee: Coin,
    pub creation: i64, // Unix timestamp (UTC)
    pub expiry: i64,
}

impl Transaction {
    /// Canonical signing payload.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("serialize transaction")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub authority: String,
    pub signature: String,
    pub transaction: Transaction,
}

impl SignedTransaction {
    pub fn sign(transaction: Transaction, keys: &KeyPair) -> Self {
        let signature = keys.sign(&transaction.canonical_bytes());
        Self {
            authority: keys.address().to_string(),
            signature,
            transaction,
        }
    }

    /// Identity: hash of the canonical serialization, signature included.
    pub fn hash(&self) -> String {
        hash_hex(&serde_json::to_vec(self).expect("serialize signed transaction"))
    }

    pub fn verify_signature(&self) -> Result<()> {
        check_signature(
            &self.authority,
            &self.signature,
            &self.transaction.canonical_bytes(),
        )
    }

    pub fn creation(&self) -> i64 {
        self.transaction.creation
    }

    pub fn expiry(&self) -> i64 {
        self.transaction.expiry
    }

    pub fn fee(&self) -> Coin {
        self.transaction.fee
    }

    pub fn action(&self) -> &Action {
        &self.transaction.action
    }
}
