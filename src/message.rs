//! Peer-to-peer wire messages and the effects a node asks its transport
//! to carry out.

use serde::{Deserialize, Serialize};

use crate::blockchain::{BlockHeader, SignedBlock};
use crate::transaction::SignedTransaction;

/// Transport-assigned peer identifier.
pub type PeerId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    SyncRequest {
        block_number: u64,
        c_sum: u64,
    },
    SyncResponse {
        block_number: u64,
        c_sum: u64,
    },
    /// Headers from `blocks_from` down to `blocks_to`.
    BlockHeaderRequest {
        blocks_from: u64,
        blocks_to: u64,
    },
    /// Newest first.
    BlockHeaderResponse {
        headers: Vec<BlockHeader>,
    },
    /// Blocks from `blocks_from` up to `blocks_to`.
    BlockchainRequest {
        blocks_from: u64,
        blocks_to: u64,
    },
    /// Oldest first.
    BlockchainResponse {
        signed_blocks: Vec<SignedBlock>,
    },
    Broadcast {
        echoes: u32,
        package: SignedTransaction,
    },
}

impl Message {
    pub fn name(&self) -> &'static str {
        match self {
            Message::SyncRequest { .. } => "SyncRequest",
            Message::SyncResponse { .. } => "SyncResponse",
            Message::BlockHeaderRequest { .. } => "BlockHeaderRequest",
            Message::BlockHeaderResponse { .. } => "BlockHeaderResponse",
            Message::BlockchainRequest { .. } => "BlockchainRequest",
            Message::BlockchainResponse { .. } => "BlockchainResponse",
            Message::Broadcast { .. } => "Broadcast",
        }
    }
}

/// Something the transport must do on behalf of the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Send { peer: PeerId, message: Message },
    Drop { peer: PeerId },
}
