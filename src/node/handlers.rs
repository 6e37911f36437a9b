use log::{debug, info, warn};

use super::Node;
use crate::error::{ChainError, Result};
use crate::message::Message;
use crate::storage::StoreGuard;
use crate::sync::SyncTarget;
use crate::transaction::{SignedTransaction, check_admission_window, check_signed_transaction};

impl Node {
    /// Process one message from a connected peer.
    pub fn handle_message(&mut self, peer: &str, message: Message, now: i64) {
        if !self.peers.contains(peer) {
            warn!("PEER ignoring {} from unknown peer {peer}", message.name());
            return;
        }
        debug!("received {} from {peer}", message.name());
        match message {
            Message::SyncRequest { c_sum, .. } => self.on_sync_request(peer, c_sum),
            Message::SyncResponse {
                block_number,
                c_sum,
            } => {
                let own = self.stores.chain.last_header().c_sum;
                let target = SyncTarget {
                    block_number,
                    c_sum,
                };
                if self.sync.record_response(peer, target, own) {
                    debug!("SYNC {peer} is ahead at block {block_number} c_sum {c_sum}");
                }
            }
            Message::BlockHeaderRequest {
                blocks_from,
                blocks_to,
            } => {
                let headers = self.stores.chain.headers_desc(
                    blocks_from,
                    blocks_to,
                    self.config.header_tr_length,
                );
                self.send(peer, Message::BlockHeaderResponse { headers });
            }
            Message::BlockchainRequest {
                blocks_from,
                blocks_to,
            } => {
                let signed_blocks = self.stores.chain.blocks_asc(
                    blocks_from,
                    blocks_to,
                    self.config.block_tr_length,
                );
                self.send(peer, Message::BlockchainResponse { signed_blocks });
            }
            Message::BlockHeaderResponse { headers } => {
                self.on_header_response(peer, headers, now)
            }
            Message::BlockchainResponse { signed_blocks } => {
                self.on_blockchain_response(peer, signed_blocks, now)
            }
            Message::Broadcast { echoes, package } => self.on_broadcast(peer, echoes, package, now),
        }
    }

    /// Answer only when our chain is strictly heavier.
    fn on_sync_request(&mut self, peer: &str, c_sum: u64) {
        let head = self.stores.chain.last_header();
        if head.c_sum > c_sum {
            let response = Message::SyncResponse {
                block_number: head.block_number,
                c_sum: head.c_sum,
            };
            self.send(peer, response);
        }
    }

    fn on_broadcast(&mut self, peer: &str, echoes: u32, package: SignedTransaction, now: i64) {
        match self.process_transaction(package.clone(), now) {
            Ok(_) if echoes > 0 => {
                let forward = Message::Broadcast {
                    echoes: echoes - 1,
                    package,
                };
                self.send_all_except(Some(peer), &forward);
            }
            Ok(_) | Err(ChainError::DuplicateSubmission(_)) => {}
            Err(err) => debug!("POOL rejected transaction from {peer}: {err}"),
        }
    }

    /// Validate a transaction and admit it to the pool, applying its effect
    /// in pending form. Returns the transaction hash.
    pub fn process_transaction(&mut self, transaction: SignedTransaction, now: i64) -> Result<String> {
        check_signed_transaction(&transaction)?;
        check_admission_window(&transaction, now, &self.config)?;
        let hash = transaction.hash();
        if self.stores.cache.contains(&hash) {
            return Err(ChainError::wrong_data(format!(
                "transaction {hash} already sealed"
            )));
        }
        if self.stores.pool.contains(&hash) {
            return Err(ChainError::DuplicateSubmission(hash));
        }

        let mut guard = StoreGuard::begin(&mut self.stores);
        guard.admit(transaction)?;
        guard.commit();
        info!("POOL accepted {hash}");
        Ok(hash)
    }

    /// Admit a locally submitted transaction and gossip it to every peer.
    pub fn submit_transaction(&mut self, transaction: SignedTransaction, now: i64) -> Result<String> {
        let hash = self.process_transaction(transaction.clone(), now)?;
        let message = Message::Broadcast {
            echoes: self.config.broadcast_echoes,
            package: transaction,
        };
        self.send_all_except(None, &message);
        Ok(hash)
    }
}
