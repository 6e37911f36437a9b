use std::collections::HashSet;

use log::{debug, info};

use crate::blockchain::{Block, Blockchain, SignedBlock};
use crate::config::ChainConfig;
use crate::consensus::{calc_delta, check_headers, check_rewards, next_consensus_const};
use crate::error::{ChainError, Result};
use crate::state::{self, ActionLog, Ledger};
use crate::storage::Transactional;
use crate::transaction::{
    SignedTransaction, TransactionCache, TransactionPool, check_block_window,
    check_signed_transaction,
};

/// Every store a node owns. They are saved, committed and discarded
/// together so no cross-store mutation is ever half applied.
///
/// Invariant between operations: the ledger holds the effects of the whole
/// chain followed by the effects of every pool transaction in admission
/// order, and the action log mirrors exactly that sequence.
#[derive(Debug)]
pub struct Stores {
    pub chain: Blockchain,
    pub ledger: Ledger,
    pub action_log: ActionLog,
    pub pool: TransactionPool,
    pub cache: TransactionCache,
}

impl Stores {
    /// Fresh stores holding the committed genesis block of `config`.
    pub fn new(config: &ChainConfig) -> Result<Self> {
        let genesis = Block::genesis(&config.chain_id, &config.genesis_allocations);
        let mut stores = Self {
            chain: Blockchain::new(SignedBlock::unsigned(genesis.clone())),
            ledger: Ledger::new(),
            action_log: ActionLog::new(),
            pool: TransactionPool::new(),
            cache: TransactionCache::new(),
        };
        for reward in &genesis.rewards {
            state::apply_reward(&mut stores.ledger, &mut stores.action_log, reward)?;
        }
        stores.save();
        stores.commit();
        info!(
            "genesis {} with {} allocations",
            stores.chain.last_hash(),
            genesis.rewards.len()
        );
        Ok(stores)
    }

    /// Apply a newly admitted transaction in pending form and pool it.
    pub fn admit(&mut self, transaction: SignedTransaction) -> Result<String> {
        state::apply_transaction(&mut self.ledger, &mut self.action_log, &transaction)?;
        self.pool.insert(transaction)
    }

    /// Undo the ledger effects of every pool transaction, newest first. The
    /// transactions stay in the pool.
    pub fn revert_pool(&mut self) -> Result<()> {
        for (_, transaction) in self.pool.in_admission_order().iter().rev() {
            state::revert_transaction(&mut self.ledger, &mut self.action_log, transaction)?;
        }
        Ok(())
    }

    /// Re-apply pool transactions in admission order on top of the current
    /// head, dropping the ones that expired, were sealed meanwhile or no
    /// longer apply.
    pub fn reapply_pool(&mut self, now: i64) -> Result<()> {
        for (hash, transaction) in self.pool.in_admission_order() {
            let reason = if transaction.expiry() < now {
                Some("expired".to_string())
            } else if self.cache.contains(&hash) {
                Some("already sealed".to_string())
            } else {
                state::apply_transaction(&mut self.ledger, &mut self.action_log, &transaction)
                    .err()
                    .map(|err| err.to_string())
            };
            if let Some(reason) = reason {
                debug!("POOL dropping {hash}: {reason}");
                self.pool.remove(&hash);
            }
        }
        Ok(())
    }

    /// Apply a block whose validity is already established: transactions,
    /// then rewards, then the chain append. Pool effects must be reverted.
    pub fn apply_block(&mut self, signed_block: SignedBlock) -> Result<()> {
        let block = &signed_block.block;
        for transaction in &block.signed_transactions {
            state::apply_transaction(&mut self.ledger, &mut self.action_log, transaction)?;
            let hash = transaction.hash();
            self.cache.insert(hash.clone(), transaction.creation());
            self.pool.remove(&hash);
        }
        for reward in &block.rewards {
            state::apply_reward(&mut self.ledger, &mut self.action_log, reward)?;
        }
        debug!(
            "block {} applied: {} transactions, {} rewards",
            block.header.block_number,
            block.signed_transactions.len(),
            block.rewards.len()
        );
        self.chain.insert(signed_block);
        Ok(())
    }

    /// Pop the head block and undo it: rewards then transactions, newest
    /// first. Sealed hashes leave the cache so the transactions may be
    /// resubmitted. Pool effects must be reverted.
    pub fn revert_last_block(&mut self) -> Result<SignedBlock> {
        let signed_block = self.chain.remove_last_block();
        let block = &signed_block.block;
        for reward in block.rewards.iter().rev() {
            state::revert_reward(&mut self.ledger, &mut self.action_log, reward)?;
        }
        for transaction in block.signed_transactions.iter().rev() {
            state::revert_transaction(&mut self.ledger, &mut self.action_log, transaction)?;
            self.cache.remove(&transaction.hash());
        }
        debug!("REORG reverted block {}", block.header.block_number);
        Ok(signed_block)
    }

    /// Put transactions of reverted blocks back into the pool, skipping the
    /// ones that cannot be accepted any more. Pool effects must be reverted;
    /// [`Stores::reapply_pool`] decides which of them survive.
    pub fn return_to_pool(&mut self, transactions: Vec<SignedTransaction>, now: i64) {
        for transaction in transactions {
            let hash = transaction.hash();
            if transaction.expiry() < now || self.cache.contains(&hash) || self.pool.contains(&hash)
            {
                continue;
            }
            if self.pool.insert(transaction).is_ok() {
                debug!("REORG returned {hash} to pool");
            }
        }
    }

    /// Confirmed mining weight of `authority` for a child of the head.
    pub fn delta_for(&self, authority: &str, config: &ChainConfig) -> u64 {
        let head = self.chain.last_header();
        calc_delta(
            authority,
            self.ledger.get_balance(authority),
            self.chain.last_hash(),
            head.c_const,
            config,
        )
    }

    /// Validate `signed_block` as the next block against the current ledger
    /// and apply it. Pool effects must be reverted. Every failure is
    /// reported as [`ChainError::WrongData`] or a signature error, so the
    /// caller can blame the peer.
    pub fn validate_and_apply_block(
        &mut self,
        signed_block: SignedBlock,
        config: &ChainConfig,
        now: i64,
    ) -> Result<()> {
        self.validate_block(&signed_block, config, now)?;
        let number = signed_block.header().block_number;
        self.apply_block(signed_block).map_err(|err| match err {
            ChainError::WrongData(_) => err,
            other => ChainError::wrong_data(format!("block {number}: {other}")),
        })
    }

    fn validate_block(
        &self,
        signed_block: &SignedBlock,
        config: &ChainConfig,
        now: i64,
    ) -> Result<()> {
        let header = signed_block.header();
        let number = header.block_number;
        let prev = self.chain.last_header();

        check_headers(header, prev, config)?;
        if header.prev_hash != self.chain.last_hash() {
            return Err(ChainError::wrong_data(format!(
                "block {number} does not extend the local head"
            )));
        }
        if header.time_signed > now + config.nodes_time_shift {
            return Err(ChainError::wrong_data(format!(
                "block {number} signed in the future"
            )));
        }
        signed_block.verify_signature()?;

        let authority = &signed_block.authority;
        let balance = self.ledger.get_balance(authority);
        if balance < config.mine_amount_threshold {
            return Err(ChainError::wrong_data(format!(
                "block {number}: authority balance {balance} below mining threshold"
            )));
        }
        let delta = self.delta_for(authority, config);
        if delta == 0 || delta != header.delta {
            return Err(ChainError::wrong_data(format!(
                "block {number}: claimed delta {} but ledger gives {delta}",
                header.delta
            )));
        }
        let c_const = next_consensus_const(delta, self.chain.headers_back(), config);
        if c_const != header.c_const {
            return Err(ChainError::wrong_data(format!(
                "block {number}: claimed c_const {} but history gives {c_const}",
                header.c_const
            )));
        }

        let transactions = &signed_block.block.signed_transactions;
        if transactions.len() > config.block_max_transactions {
            return Err(ChainError::wrong_data(format!(
                "block {number}: {} transactions over the limit",
                transactions.len()
            )));
        }
        let mut last_creation = i64::MIN;
        let mut sealed = HashSet::with_capacity(transactions.len());
        for transaction in transactions {
            check_signed_transaction(transaction)?;
            check_block_window(transaction, header.time_signed, config)?;
            if transaction.creation() < last_creation {
                return Err(ChainError::wrong_data(format!(
                    "block {number}: transactions not in creation order"
                )));
            }
            last_creation = transaction.creation();
            let hash = transaction.hash();
            if self.cache.contains(&hash) || !sealed.insert(hash.clone()) {
                return Err(ChainError::wrong_data(format!(
                    "block {number}: transaction {hash} already used"
                )));
            }
        }
        check_rewards(&signed_block.block, authority, config)
    }
}

impl Transactional for Stores {
    fn save(&mut self) {
        self.chain.save();
        self.ledger.save();
        self.action_log.save();
        self.pool.save();
        self.cache.save();
    }

    fn commit(&mut self) {
        self.chain.commit();
        self.ledger.commit();
        self.action_log.commit();
        self.pool.commit();
        self.cache.commit();
    }

    fn discard(&mut self) {
        self.chain.discard();
        self.ledger.discard();
        self.action_log.discard();
        self.pool.discard();
        self.cache.discard();
    }
}
