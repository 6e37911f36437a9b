use log::debug;
use serde::Serialize;
use uuid::Uuid;

use super::SyncTarget;
use crate::blockchain::{BlockHeader, Blockchain, SignedBlock};
use crate::config::ChainConfig;
use crate::consensus::{check_const_history, check_header_sequence, check_headers};
use crate::error::{ChainError, Result};
use crate::message::{Message, PeerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    AwaitingSyncResponse,
    AwaitingHeaders,
    AwaitingBlocks,
    Applying,
}

/// What to do after a header batch was accepted.
#[derive(Debug, PartialEq, Eq)]
pub enum HeaderProgress {
    /// No common block yet; send this request for an older batch.
    NeedOlder(Message),
    /// Last common block found; start fetching blocks with this request.
    CommonBlockFound(Message),
    /// The peer's chain no longer beats ours.
    NotAhead,
}

/// What to do after a block batch was buffered.
#[derive(Debug, PartialEq, Eq)]
pub enum BlockProgress {
    /// Every announced block is buffered.
    Complete,
    /// The buffer is full and already beats the local head; apply it and
    /// continue.
    ApplyPartial,
    /// Send this request for the next span.
    NeedMore(Message),
}

/// One header-first synchronization attempt against a single peer.
#[derive(Debug)]
pub struct SyncSession {
    pub id: Uuid,
    pub peer: PeerId,
    pub target: SyncTarget,
    pub state: SyncState,
    pub started: i64,
    /// Deadline of the request in flight.
    pub step_deadline: i64,
    // candidate headers, newest first
    headers: Vec<BlockHeader>,
    requested_from: u64,
    lcb: Option<u64>,
    // buffered blocks following the last common block, oldest first
    blocks: Vec<SignedBlock>,
}

impl SyncSession {
    pub fn new(peer: PeerId, target: SyncTarget, now: i64, config: &ChainConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            target,
            state: SyncState::AwaitingHeaders,
            started: now,
            step_deadline: now + config.sync_step_timeout,
            headers: Vec::new(),
            requested_from: target.block_number,
            lcb: None,
            blocks: Vec::new(),
        }
    }

    pub fn lcb(&self) -> Option<u64> {
        self.lcb
    }

    pub fn buffered(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_expired(&self, now: i64, config: &ChainConfig) -> bool {
        now > self.step_deadline || now - self.started > config.sync_session_timeout
    }

    pub fn touch(&mut self, now: i64, config: &ChainConfig) {
        self.step_deadline = now + config.sync_step_timeout;
    }

    /// Request for the batch of headers ending at `requested_from`.
    pub fn header_request(&self, config: &ChainConfig) -> Message {
        let span = config.header_tr_length.max(1) - 1;
        Message::BlockHeaderRequest {
            blocks_from: self.requested_from,
            blocks_to: self.requested_from.saturating_sub(span),
        }
    }

    fn top(&self) -> u64 {
        self.headers
            .first()
            .map(|h| h.block_number)
            .unwrap_or(self.target.block_number)
    }

    fn next_block_number(&self) -> u64 {
        self.lcb.unwrap_or(0) + 1 + self.blocks.len() as u64
    }

    /// Request for the next span of blocks after the buffer.
    pub fn block_request(&self, config: &ChainConfig) -> Message {
        let from = self.next_block_number();
        let span = config.block_tr_length.max(1) - 1;
        Message::BlockchainRequest {
            blocks_from: from,
            blocks_to: (from + span).min(self.top()),
        }
    }

    /// Validate a header batch (newest first), accumulate it and look for
    /// the last common block with `chain`.
    pub fn accept_headers(
        &mut self,
        headers: Vec<BlockHeader>,
        chain: &Blockchain,
        config: &ChainConfig,
        now: i64,
    ) -> Result<HeaderProgress> {
        let Some(newest) = headers.first() else {
            return Err(ChainError::wrong_data("empty header response"));
        };
        if headers.len() as u64 > config.header_tr_length {
            return Err(ChainError::wrong_data(format!(
                "{} headers over the batch limit",
                headers.len()
            )));
        }
        if newest.block_number != self.requested_from {
            return Err(ChainError::wrong_data(format!(
                "header batch starts at {} instead of {}",
                newest.block_number, self.requested_from
            )));
        }
        for pair in headers.windows(2) {
            check_headers(&pair[0], &pair[1], config)?;
        }
        match self.headers.last() {
            Some(oldest) => check_headers(oldest, newest, config)?,
            None => {
                if newest.time_signed > now + config.nodes_time_shift {
                    return Err(ChainError::wrong_data(format!(
                        "header {} signed in the future",
                        newest.block_number
                    )));
                }
                if newest.c_sum <= chain.last_header().c_sum {
                    return Ok(HeaderProgress::NotAhead);
                }
            }
        }

        let checked = self.headers.len();
        self.headers.extend(headers);

        let mut found = None;
        for (index, header) in self.headers.iter().enumerate().skip(checked) {
            if header.block_number == 0 {
                return Err(ChainError::wrong_data("no common block with peer chain"));
            }
            let parent = header.block_number - 1;
            if chain.hash_at(parent) == Some(header.prev_hash.as_str()) {
                found = Some((index, parent));
                break;
            }
        }

        let Some((index, lcb)) = found else {
            let oldest = self.headers.last().map_or(0, |h| h.block_number);
            self.requested_from = oldest - 1;
            debug!(
                "SYNC {} no common block above {oldest}, asking older headers",
                self.id
            );
            return Ok(HeaderProgress::NeedOlder(self.header_request(config)));
        };

        self.headers.truncate(index + 1);
        let candidates: Vec<BlockHeader> = self.headers.iter().rev().cloned().collect();
        let base_from = (lcb + 1).saturating_sub(config.delta_step + 1);
        let base: Vec<BlockHeader> = (base_from..=lcb)
            .filter_map(|n| chain.header_at(n).cloned())
            .collect();
        let linked: Vec<BlockHeader> = base.last().into_iter().chain(&candidates).cloned().collect();
        check_header_sequence(&linked, config)?;
        check_const_history(&base, &candidates, config)?;

        self.lcb = Some(lcb);
        self.state = SyncState::AwaitingBlocks;
        debug!(
            "SYNC {} last common block {lcb}, {} blocks to fetch",
            self.id,
            candidates.len()
        );
        Ok(HeaderProgress::CommonBlockFound(self.block_request(config)))
    }

    /// Check a block batch (oldest first) against the announced headers and
    /// buffer it. Nothing is applied here.
    pub fn accept_blocks(
        &mut self,
        signed_blocks: Vec<SignedBlock>,
        chain: &Blockchain,
        config: &ChainConfig,
    ) -> Result<BlockProgress> {
        let Some(lcb) = self.lcb else {
            return Err(ChainError::wrong_data("blocks before headers"));
        };
        if signed_blocks.is_empty() || signed_blocks.len() as u64 > config.block_tr_length {
            return Err(ChainError::wrong_data(format!(
                "block response of {} blocks",
                signed_blocks.len()
            )));
        }
        let top = self.top();
        for signed_block in signed_blocks {
            let expected = self.next_block_number();
            let number = signed_block.header().block_number;
            if number != expected || expected > top {
                return Err(ChainError::wrong_data(format!(
                    "got block {number}, expected {expected}"
                )));
            }
            let announced = &self.headers[(top - expected) as usize];
            if signed_block.header() != announced {
                return Err(ChainError::wrong_data(format!(
                    "block {number} differs from its announced header"
                )));
            }
            signed_block.verify_signature()?;
            let parent_hash = match self.blocks.last() {
                Some(parent) => parent.block.compute_hash(),
                None => chain.hash_at(lcb).unwrap_or_default().to_string(),
            };
            if announced.prev_hash != parent_hash {
                return Err(ChainError::wrong_data(format!(
                    "block {number} does not link to its parent"
                )));
            }
            self.blocks.push(signed_block);
        }

        let tip = self.blocks.last().map(|b| b.header());
        match tip {
            Some(tip) if tip.block_number == top => Ok(BlockProgress::Complete),
            Some(tip)
                if self.blocks.len() >= config.block_insert_length
                    && tip.c_sum > chain.last_header().c_sum =>
            {
                Ok(BlockProgress::ApplyPartial)
            }
            _ => Ok(BlockProgress::NeedMore(self.block_request(config))),
        }
    }

    /// Hand over the buffered blocks with the common block they extend.
    pub fn take_blocks(&mut self) -> (u64, Vec<SignedBlock>) {
        (self.lcb.unwrap_or(0), std::mem::take(&mut self.blocks))
    }

    /// Continue after a partial apply that moved the local head to `head`.
    pub fn advance(&mut self, head: u64) {
        self.lcb = Some(head);
        self.state = SyncState::AwaitingBlocks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Block;
    use crate::wallet::KeyPair;

    fn config() -> ChainConfig {
        ChainConfig {
            block_mine_delay: 10,
            header_tr_length: 3,
            block_tr_length: 2,
            block_insert_length: 2,
            ..ChainConfig::default()
        }
    }

    fn next_block(keys: &KeyPair, parent: &SignedBlock, delta: u64) -> SignedBlock {
        let prev = parent.header();
        let block = Block {
            header: BlockHeader {
                block_number: prev.block_number + 1,
                delta,
                c_sum: prev.c_sum + delta,
                c_const: prev.c_const,
                prev_hash: parent.block.compute_hash(),
                time_signed: prev.time_signed + 10,
            },
            signed_transactions: Vec::new(),
            rewards: Vec::new(),
        };
        SignedBlock::sign(block, keys)
    }

    /// Local chain of `local` blocks and a peer fork of `fork` blocks from `lcb`.
    fn fixture(local: u64, lcb: u64, fork: u64) -> (Blockchain, Vec<SignedBlock>) {
        let keys = KeyPair::generate();
        let mut chain = Blockchain::new(SignedBlock::unsigned(Block::genesis("t", &[])));
        let mut peer = vec![chain.last_block().clone()];
        for n in 1..=local.max(lcb) {
            let b = next_block(&keys, chain.last_block(), 1);
            chain.insert(b.clone());
            if n <= lcb {
                peer.push(b);
            }
        }
        for _ in 0..fork {
            let b = next_block(&keys, peer.last().unwrap(), 5);
            peer.push(b);
        }
        (chain, peer)
    }

    fn headers_desc(peer: &[SignedBlock], from: u64, count: usize) -> Vec<BlockHeader> {
        peer[..=from as usize]
            .iter()
            .rev()
            .take(count)
            .map(|b| b.header().clone())
            .collect()
    }

    fn target(peer: &[SignedBlock]) -> SyncTarget {
        let h = peer.last().unwrap().header();
        SyncTarget {
            block_number: h.block_number,
            c_sum: h.c_sum,
        }
    }

    #[test]
    fn finds_common_block_across_batches() {
        let cfg = config();
        let (chain, peer) = fixture(3, 1, 4);
        let mut session = SyncSession::new("p".into(), target(&peer), 0, &cfg);

        let first = headers_desc(&peer, 5, 3);
        let progress = session.accept_headers(first, &chain, &cfg, 100).unwrap();
        assert_eq!(
            progress,
            HeaderProgress::NeedOlder(Message::BlockHeaderRequest {
                blocks_from: 2,
                blocks_to: 0
            })
        );

        let second = headers_desc(&peer, 2, 3);
        let progress = session.accept_headers(second, &chain, &cfg, 100).unwrap();
        assert_eq!(
            progress,
            HeaderProgress::CommonBlockFound(Message::BlockchainRequest {
                blocks_from: 2,
                blocks_to: 3
            })
        );
        assert_eq!(session.lcb(), Some(1));
    }

    #[test]
    fn rejects_unchained_headers() {
        let cfg = config();
        let (chain, peer) = fixture(1, 1, 3);
        let mut session = SyncSession::new("p".into(), target(&peer), 0, &cfg);
        let mut headers = headers_desc(&peer, 4, 3);
        headers[1].c_sum += 1;
        assert!(session.accept_headers(headers, &chain, &cfg, 100).is_err());
    }

    #[test]
    fn weaker_chain_is_not_followed() {
        let cfg = config();
        let (chain, _) = fixture(6, 0, 0);
        let (_, peer) = fixture(0, 0, 1);
        let mut session = SyncSession::new("p".into(), target(&peer), 0, &cfg);
        let headers = headers_desc(&peer, 1, 3);
        assert_eq!(
            session.accept_headers(headers, &chain, &cfg, 100).unwrap(),
            HeaderProgress::NotAhead
        );
    }

    #[test]
    fn buffers_blocks_and_reports_partial_apply() {
        let cfg = config();
        let (chain, peer) = fixture(1, 1, 3);
        let mut session = SyncSession::new("p".into(), target(&peer), 0, &cfg);
        let first = headers_desc(&peer, 4, 3);
        session.accept_headers(first, &chain, &cfg, 100).unwrap();
        assert_eq!(session.lcb(), Some(1));

        let progress = session
            .accept_blocks(peer[2..4].to_vec(), &chain, &cfg)
            .unwrap();
        assert_eq!(progress, BlockProgress::ApplyPartial);

        let (lcb, blocks) = session.take_blocks();
        assert_eq!((lcb, blocks.len()), (1, 2));
    }

    #[test]
    fn block_must_match_announced_header() {
        let cfg = config();
        let (chain, peer) = fixture(1, 1, 3);
        let mut session = SyncSession::new("p".into(), target(&peer), 0, &cfg);
        session
            .accept_headers(headers_desc(&peer, 4, 3), &chain, &cfg, 100)
            .unwrap();

        let mut forged = peer[2].clone();
        forged.block.header.time_signed += 1;
        assert!(session.accept_blocks(vec![forged], &chain, &cfg).is_err());
    }
}
