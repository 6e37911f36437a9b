use log::{debug, info, warn};

use super::{Node, Stores};
use crate::blockchain::{BlockHeader, SignedBlock};
use crate::error::{ChainError, Result};
use crate::message::{Message, PeerId};
use crate::peers::RequestKind;
use crate::storage::StoreGuard;
use crate::sync::{BlockProgress, HeaderProgress, SyncState, SyncTarget};

impl Node {
    pub(super) fn start_sync(&mut self, peer: PeerId, target: SyncTarget, now: i64) {
        let request = self.sync.start(peer.clone(), target, now, &self.config);
        self.request(&peer, request, RequestKind::Headers);
    }

    fn request(&mut self, peer: &str, message: Message, kind: RequestKind) {
        self.peers
            .expect(peer, kind, self.config.packet_expiry_steps);
        self.send(peer, message);
    }

    pub(super) fn on_header_response(&mut self, peer: &str, headers: Vec<BlockHeader>, now: i64) {
        if !self.peers.fulfil(peer, RequestKind::Headers) {
            debug!("SYNC unsolicited headers from {peer}");
            return;
        }
        let Some(session) = self.sync.session_with(peer) else {
            return;
        };
        if session.state != SyncState::AwaitingHeaders {
            return;
        }
        session.touch(now, &self.config);
        let id = session.id;
        let outcome = session.accept_headers(headers, &self.stores.chain, &self.config, now);

        match outcome {
            Ok(HeaderProgress::NeedOlder(request)) => {
                self.request(peer, request, RequestKind::Headers)
            }
            Ok(HeaderProgress::CommonBlockFound(request)) => {
                self.request(peer, request, RequestKind::Blocks)
            }
            Ok(HeaderProgress::NotAhead) => {
                info!("SYNC {id} {peer} is no longer ahead");
                self.finish_sync();
            }
            Err(err) => self.fail_sync(peer, err),
        }
    }

    pub(super) fn on_blockchain_response(
        &mut self,
        peer: &str,
        signed_blocks: Vec<SignedBlock>,
        now: i64,
    ) {
        if !self.peers.fulfil(peer, RequestKind::Blocks) {
            debug!("SYNC unsolicited blocks from {peer}");
            return;
        }
        let Some(session) = self.sync.session_with(peer) else {
            return;
        };
        if session.state != SyncState::AwaitingBlocks {
            return;
        }
        session.touch(now, &self.config);
        let outcome = session.accept_blocks(signed_blocks, &self.stores.chain, &self.config);

        match outcome {
            Ok(BlockProgress::NeedMore(request)) => {
                self.request(peer, request, RequestKind::Blocks)
            }
            Ok(BlockProgress::ApplyPartial) => match self.apply_buffered(now) {
                Ok(()) => {
                    let head = self.stores.chain.last_header().block_number;
                    let request = self.sync.session_mut().map(|session| {
                        session.advance(head);
                        session.block_request(&self.config)
                    });
                    if let Some(request) = request {
                        self.request(peer, request, RequestKind::Blocks);
                    }
                }
                Err(err) => self.fail_sync(peer, err),
            },
            Ok(BlockProgress::Complete) => match self.apply_buffered(now) {
                Ok(()) => self.finish_sync(),
                Err(err) => self.fail_sync(peer, err),
            },
            Err(err) => self.fail_sync(peer, err),
        }
    }

    /// Swap the local chain for the buffered fork in one all-or-nothing step:
    /// revert the pool, pop back to the last common block, replay the
    /// buffered blocks with full validation, then return orphaned
    /// transactions to the pool and re-apply it.
    fn apply_buffered(&mut self, now: i64) -> Result<()> {
        let Some(session) = self.sync.session_mut() else {
            return Ok(());
        };
        session.state = SyncState::Applying;
        let id = session.id;
        let (lcb, blocks) = session.take_blocks();

        let mut guard = StoreGuard::begin(&mut self.stores);
        let stores: &mut Stores = &mut guard;
        let old_head = stores.chain.last_header().clone();

        stores.revert_pool()?;
        let mut popped = Vec::new();
        while stores.chain.length() > lcb + 1 {
            popped.push(stores.revert_last_block()?);
        }
        let applied = blocks.len();
        for signed_block in blocks {
            stores.validate_and_apply_block(signed_block, &self.config, now)?;
        }

        let new_head = stores.chain.last_header().clone();
        if new_head.c_sum <= old_head.c_sum {
            return Err(ChainError::wrong_data(format!(
                "fork ending at c_sum {} does not beat local c_sum {}",
                new_head.c_sum, old_head.c_sum
            )));
        }

        let orphaned = popped
            .into_iter()
            .rev()
            .flat_map(|b| b.block.signed_transactions)
            .collect();
        stores.return_to_pool(orphaned, now);
        stores.reapply_pool(now)?;
        guard.commit();

        info!(
            "REORG {id}: reverted to {lcb}, applied {applied} blocks, head {} c_sum {} (was {} c_sum {})",
            new_head.block_number, new_head.c_sum, old_head.block_number, old_head.c_sum
        );
        Ok(())
    }

    fn finish_sync(&mut self) {
        if let Some(session) = self.sync.finish() {
            self.peers.clear(&session.peer);
            let head = self.stores.chain.last_header();
            info!(
                "SYNC {} finished, head {} c_sum {}",
                session.id, head.block_number, head.c_sum
            );
        }
    }

    fn fail_sync(&mut self, peer: &str, err: ChainError) {
        self.abort_sync(&err.to_string());
        if err.is_peer_fault() {
            self.drop_peer(peer, &err.to_string());
        }
    }

    /// Cancel the running session. Store changes never outlive a failed
    /// step, so there is nothing else to undo.
    pub(super) fn abort_sync(&mut self, reason: &str) {
        if let Some(session) = self.sync.finish() {
            self.peers.clear(&session.peer);
            warn!("SYNC {} with {} aborted: {reason}", session.id, session.peer);
        }
    }
}
