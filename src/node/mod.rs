//! The node context: every store, the peer book, the sync engine and the
//! outbox, owned by one value and driven by `handle_message` and `tick`.

mod handlers;
mod miner;
pub mod stores;
mod sync;
mod worker;

use std::collections::VecDeque;

use log::{info, warn};

pub use stores::Stores;

use crate::blockchain::{BlockHeader, Coin};
use crate::config::{ChainConfig, NodeConfig};
use crate::error::Result;
use crate::message::{Message, Outgoing, PeerId};
use crate::peers::PeerBook;
use crate::sync::{SyncEngine, SyncState};
use crate::wallet::KeyPair;

#[derive(Debug, Default)]
struct Timers {
    last_sync_round: Option<i64>,
    last_cleanup: i64,
    last_rebroadcast: i64,
}

pub struct Node {
    config: ChainConfig,
    settings: NodeConfig,
    keys: KeyPair,
    stores: Stores,
    peers: PeerBook,
    sync: SyncEngine,
    outbox: VecDeque<Outgoing>,
    timers: Timers,
}

impl Node {
    pub fn new(config: ChainConfig, settings: NodeConfig, keys: KeyPair) -> Result<Self> {
        let stores = Stores::new(&config)?;
        info!(
            "node {} ready (miner: {}, chain: {})",
            keys.address(),
            settings.miner,
            config.chain_id
        );
        Ok(Self {
            config,
            settings,
            keys,
            stores,
            peers: PeerBook::new(),
            sync: SyncEngine::new(),
            outbox: VecDeque::new(),
            timers: Timers::default(),
        })
    }

    pub fn address(&self) -> &str {
        self.keys.address()
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn head(&self) -> &BlockHeader {
        self.stores.chain.last_header()
    }

    pub fn head_hash(&self) -> &str {
        self.stores.chain.last_hash()
    }

    pub fn balance(&self, address: &str) -> Coin {
        self.stores.ledger.get_balance(address)
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.in_progress()
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.ids()
    }

    /// Register a connection. Unknown peers' messages are ignored.
    pub fn add_peer(&mut self, peer: &str) -> bool {
        self.peers.add(peer)
    }

    /// The transport lost `peer`. Its sync session, if any, is cancelled.
    pub fn remove_peer(&mut self, peer: &str) {
        if !self.peers.remove(peer) {
            return;
        }
        self.sync.forget(peer);
        if self.sync.session().is_some_and(|s| s.peer == peer) {
            self.abort_sync("peer disconnected");
        }
    }

    /// Disconnect `peer` on our own initiative.
    fn drop_peer(&mut self, peer: &str, reason: &str) {
        warn!("PEER dropping {peer}: {reason}");
        self.remove_peer(peer);
        self.outbox.push_back(Outgoing::Drop {
            peer: peer.to_string(),
        });
    }

    /// Take every effect queued since the last call, in order.
    pub fn drain_outbox(&mut self) -> Vec<Outgoing> {
        self.outbox.drain(..).collect()
    }

    fn send(&mut self, peer: &str, message: Message) {
        self.outbox.push_back(Outgoing::Send {
            peer: peer.to_string(),
            message,
        });
    }

    fn send_all_except(&mut self, except: Option<&str>, message: &Message) {
        for peer in self.peers.ids() {
            if Some(peer.as_str()) != except {
                self.send(&peer, message.clone());
            }
        }
    }
}
