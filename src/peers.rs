use std::collections::BTreeMap;

use log::{debug, warn};

use crate::message::PeerId;

/// Requests whose answer a peer owes us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Headers,
    Blocks,
}

#[derive(Debug, Clone, Copy)]
struct Outstanding {
    kind: RequestKind,
    steps_left: u32,
}

/// Connected peers and at most one outstanding request per peer, each with
/// an expiry counted in ticks.
#[derive(Debug, Default)]
pub struct PeerBook {
    peers: BTreeMap<PeerId, Option<Outstanding>>,
}

impl PeerBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the peer was already known.
    pub fn add(&mut self, peer: &str) -> bool {
        if self.peers.contains_key(peer) {
            return false;
        }
        debug!("PEER connected {peer}");
        self.peers.insert(peer.to_string(), None);
        true
    }

    pub fn remove(&mut self, peer: &str) -> bool {
        let removed = self.peers.remove(peer).is_some();
        if removed {
            debug!("PEER disconnected {peer}");
        }
        removed
    }

    pub fn contains(&self, peer: &str) -> bool {
        self.peers.contains_key(peer)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Peer ids in stable order.
    pub fn ids(&self) -> Vec<PeerId> {
        self.peers.keys().cloned().collect()
    }

    /// Record a request sent to `peer`, replacing any earlier one.
    pub fn expect(&mut self, peer: &str, kind: RequestKind, steps: u32) {
        if let Some(slot) = self.peers.get_mut(peer) {
            *slot = Some(Outstanding {
                kind,
                steps_left: steps,
            });
        }
    }

    /// Clear the outstanding request if it is of `kind`. Returns whether a
    /// matching request was pending.
    pub fn fulfil(&mut self, peer: &str, kind: RequestKind) -> bool {
        match self.peers.get_mut(peer) {
            Some(slot) if slot.is_some_and(|o| o.kind == kind) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self, peer: &str) {
        if let Some(slot) = self.peers.get_mut(peer) {
            *slot = None;
        }
    }

    /// Advance every counter by one tick and return the peers whose request
    /// ran out. Their entries are cleared; dropping them is up to the caller.
    pub fn do_step(&mut self) -> Vec<PeerId> {
        let mut expired = Vec::new();
        for (peer, slot) in self.peers.iter_mut() {
            if let Some(outstanding) = slot {
                if outstanding.steps_left == 0 {
                    warn!("PEER {peer} did not answer {:?} request", outstanding.kind);
                    expired.push(peer.clone());
                    *slot = None;
                } else {
                    outstanding.steps_left -= 1;
                }
            }
        }
        expired
    }
}
