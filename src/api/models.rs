use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::blockchain::{BlockHeader, Coin};
use crate::message::{Message, Outgoing, PeerId};
use crate::node::Node;
use crate::sync::SyncState;
use crate::transaction::NodeType;

/// Shared application state: the node plus the messages waiting for each
/// peer to pull them.
pub struct AppState {
    pub node: Mutex<Node>,
    pub outboxes: Mutex<HashMap<PeerId, Vec<Message>>>,
}

impl AppState {
    pub fn new(node: Node) -> Self {
        Self {
            node: Mutex::new(node),
            outboxes: Mutex::new(HashMap::new()),
        }
    }

    /// Move the node's queued effects into the per-peer outboxes. A dropped
    /// peer loses its outbox and has to join again.
    pub fn route(&self, effects: Vec<Outgoing>) {
        if effects.is_empty() {
            return;
        }
        let mut outboxes = self.outboxes.lock().expect("mutex poisoned");
        for effect in effects {
            match effect {
                Outgoing::Send { peer, message } => {
                    if let Some(queue) = outboxes.get_mut(&peer) {
                        queue.push(message);
                    }
                }
                Outgoing::Drop { peer } => {
                    outboxes.remove(&peer);
                }
            }
        }
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse {
    pub chain_id: String,
    pub node_address: String,
    pub length: u64,
    pub head: BlockHeader,
    pub head_hash: String,
    pub pool_size: usize,
    pub peers: Vec<PeerId>,
    pub sync_state: SyncState,
}

#[derive(Serialize)]
pub struct HeaderResponse {
    pub hash: String,
    pub header: BlockHeader,
    pub transactions: usize,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct TransferRequest {
    pub private_key: String,
    pub to: String,
    pub amount: Coin,
    #[serde(default)]
    pub fee: Coin,
    #[serde(default)]
    pub message: String,
    /// Seconds until expiry; defaults to the full transaction lifetime.
    pub lifetime_secs: Option<i64>,
}

#[derive(Serialize)]
pub struct NewTxResponse {
    pub hash: String,
}

#[derive(Serialize)]
pub struct PoolResponse {
    pub size: usize,
    pub transactions: Vec<String>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: Coin,
    pub role: Option<NodeType>,
}

/* ---------- P2P API Models ---------- */

#[derive(Serialize)]
pub struct JoinResponse {
    pub peer: PeerId,
    pub joined: bool,
}
