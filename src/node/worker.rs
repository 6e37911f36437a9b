use log::{debug, error, info};

use super::{Node, Stores};
use crate::error::Result;
use crate::message::Message;
use crate::storage::StoreGuard;

impl Node {
    /// Periodic step of the event loop: expire requests and sessions, run
    /// housekeeping, then either follow a heavier peer or mine.
    pub fn tick(&mut self, now: i64) {
        for peer in self.peers.do_step() {
            self.drop_peer(&peer, "request expired");
        }
        let timed_out = self
            .sync
            .session()
            .filter(|session| session.is_expired(now, &self.config))
            .map(|session| session.peer.clone());
        if let Some(peer) = timed_out {
            self.drop_peer(&peer, "sync session timed out");
        }

        self.housekeeping(now);
        if self.sync.in_progress() {
            return;
        }

        self.sync_or_mine(now);

        let round_due = self
            .timers
            .last_sync_round
            .is_none_or(|last| now - last >= self.settings.sync_interval_secs);
        if !self.sync.in_progress() && round_due && !self.peers.is_empty() {
            let head = self.stores.chain.last_header();
            let request = self.sync.open_round(head.block_number, head.c_sum);
            self.send_all_except(None, &request);
            self.timers.last_sync_round = Some(now);
        }
    }

    /// Sync with the heaviest peer if its chain beats what we could reach
    /// by mining now; otherwise mine when allowed.
    fn sync_or_mine(&mut self, now: i64) {
        let own_c_sum = self.stores.chain.last_header().c_sum;
        let weight = match self.mining_weight(now) {
            Ok(weight) => weight,
            Err(err) => {
                error!("MINER weight check failed: {err}");
                None
            }
        };
        let promised = own_c_sum.saturating_add(weight.unwrap_or(0));

        if let Some((peer, target)) = self.sync.best_response(promised) {
            self.start_sync(peer, target, now);
            return;
        }
        if weight.is_some() {
            match self.mine_block(now) {
                Ok(Some(_)) => {}
                Ok(None) => debug!("MINER not eligible at {now}"),
                Err(err) => error!("MINER failed: {err}"),
            }
        }
    }

    /// Weight a block mined now would carry, if this node may mine now.
    fn mining_weight(&mut self, now: i64) -> Result<Option<u64>> {
        if !self.settings.miner {
            return Ok(None);
        }
        let head = self.stores.chain.last_header();
        if now - head.time_signed < self.config.block_mine_delay {
            return Ok(None);
        }
        let me = self.keys.address();
        let mut guard = StoreGuard::begin(&mut self.stores);
        guard.revert_pool()?;
        let delta = if guard.ledger.get_balance(me) < self.config.mine_amount_threshold {
            0
        } else {
            guard.delta_for(me, &self.config)
        };
        guard.abort();
        Ok((delta > 0).then_some(delta))
    }

    fn housekeeping(&mut self, now: i64) {
        if now - self.timers.last_cleanup >= self.settings.cleanup_interval_secs {
            self.timers.last_cleanup = now;
            if let Err(err) = self.cleanup(now) {
                error!("POOL cleanup failed: {err}");
            }
        }
        if now - self.timers.last_rebroadcast >= self.settings.rebroadcast_interval_secs {
            self.timers.last_rebroadcast = now;
            self.rebroadcast_pool(now);
        }
    }

    /// Evict stale cache entries and drop pool transactions that expired
    /// or no longer apply.
    fn cleanup(&mut self, now: i64) -> Result<()> {
        let mut guard = StoreGuard::begin(&mut self.stores);
        let stores: &mut Stores = &mut guard;
        let evicted = stores.cache.cleanup(now, self.config.transaction_lifetime);
        let before = stores.pool.len();
        stores.revert_pool()?;
        stores.reapply_pool(now)?;
        let dropped = before - stores.pool.len();
        guard.commit();
        if evicted + dropped > 0 {
            info!("POOL cleanup: {evicted} cache entries evicted, {dropped} transactions dropped");
        }
        Ok(())
    }

    /// Gossip pool transactions that should have been mined by now.
    fn rebroadcast_pool(&mut self, now: i64) {
        if self.peers.is_empty() {
            return;
        }
        let stale: Vec<_> = self
            .stores
            .pool
            .in_admission_order()
            .into_iter()
            .filter(|(_, t)| {
                t.creation() + self.config.block_mine_delay < now && t.expiry() >= now
            })
            .collect();
        for (hash, transaction) in stale {
            debug!("POOL rebroadcasting {hash}");
            let message = Message::Broadcast {
                echoes: self.config.broadcast_echoes,
                package: transaction,
            };
            self.send_all_except(None, &message);
        }
    }
}
