use log::{debug, info};

use super::{Node, Stores};
use crate::blockchain::{Block, BlockHeader, SignedBlock};
use crate::consensus::{calc_delta, grant_rewards, next_consensus_const};
use crate::error::{ChainError, Result};
use crate::state;
use crate::storage::StoreGuard;

impl Node {
    /// Build, sign and append a block on top of the head.
    ///
    /// Pool effects are reverted first so the weight is computed on the
    /// confirmed ledger. Pool transactions created by `now` are taken in
    /// creation order, skipping the ones that no longer apply, up to the
    /// block limit; the rest of the pool is re-applied on the new head.
    /// Returns `None` when this node may not mine yet.
    pub fn mine_block(&mut self, now: i64) -> Result<Option<SignedBlock>> {
        if self.sync.in_progress() {
            return Ok(None);
        }
        let config = &self.config;
        let me = self.keys.address();

        let mut guard = StoreGuard::begin(&mut self.stores);
        let stores: &mut Stores = &mut guard;
        stores.revert_pool()?;

        let head = stores.chain.last_header().clone();
        let prev_hash = stores.chain.last_hash().to_string();
        if now - head.time_signed < config.block_mine_delay {
            return Ok(None);
        }
        let balance = stores.ledger.get_balance(me);
        if balance < config.mine_amount_threshold {
            debug!("MINER balance {balance} below threshold");
            return Ok(None);
        }
        let delta = calc_delta(me, balance, &prev_hash, head.c_const, config);
        if delta == 0 {
            debug!("MINER zero weight on {prev_hash}");
            return Ok(None);
        }
        let c_const = next_consensus_const(delta, stores.chain.headers_back(), config);
        let c_sum = head
            .c_sum
            .checked_add(delta)
            .ok_or_else(|| ChainError::wrong_data("c_sum overflow"))?;

        // trial-apply candidates to find the ones that still fit
        let mut selected = Vec::new();
        for (hash, transaction) in stores.pool.by_creation() {
            if selected.len() >= config.block_max_transactions {
                break;
            }
            if transaction.creation() > now
                || transaction.expiry() < now
                || stores.cache.contains(&hash)
            {
                continue;
            }
            match state::apply_transaction(&mut stores.ledger, &mut stores.action_log, &transaction)
            {
                Ok(()) => selected.push(transaction),
                Err(err) => debug!("MINER skipping {hash}: {err}"),
            }
        }
        for transaction in selected.iter().rev() {
            state::revert_transaction(&mut stores.ledger, &mut stores.action_log, transaction)?;
        }

        let rewards = grant_rewards(&selected, me, config)?;
        let block = Block {
            header: BlockHeader {
                block_number: head.block_number + 1,
                delta,
                c_sum,
                c_const,
                prev_hash,
                time_signed: now,
            },
            signed_transactions: selected,
            rewards,
        };
        let signed_block = SignedBlock::sign(block, &self.keys);
        stores.apply_block(signed_block.clone())?;
        stores.reapply_pool(now)?;
        guard.commit();

        let header = signed_block.header();
        info!(
            "MINER sealed block {} delta {} c_sum {} c_const {} with {} transactions",
            header.block_number,
            header.delta,
            header.c_sum,
            header.c_const,
            signed_block.block.signed_transactions.len()
        );
        Ok(Some(signed_block))
    }
}
