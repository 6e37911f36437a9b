//! Header-first chain synchronization: who to follow and the per-peer
//! session state machine.

pub mod session;

use std::collections::BTreeMap;

use log::info;
use serde::Serialize;

pub use session::{BlockProgress, HeaderProgress, SyncSession, SyncState};

use crate::config::ChainConfig;
use crate::message::{Message, PeerId};

/// A peer's advertised head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncTarget {
    pub block_number: u64,
    pub c_sum: u64,
}

/// Sync responses of the current round plus the single active session.
#[derive(Debug, Default)]
pub struct SyncEngine {
    responses: BTreeMap<PeerId, SyncTarget>,
    session: Option<SyncSession>,
    round_open: bool,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        match &self.session {
            Some(session) => session.state,
            None if self.round_open && self.responses.is_empty() => {
                SyncState::AwaitingSyncResponse
            }
            None => SyncState::Idle,
        }
    }

    pub fn in_progress(&self) -> bool {
        self.session.is_some()
    }

    /// Forget previous answers and build the request for a new round.
    pub fn open_round(&mut self, block_number: u64, c_sum: u64) -> Message {
        self.responses.clear();
        self.round_open = true;
        Message::SyncRequest {
            block_number,
            c_sum,
        }
    }

    /// Keep a peer's answer if it is strictly ahead of `own_c_sum`.
    pub fn record_response(&mut self, peer: &str, target: SyncTarget, own_c_sum: u64) -> bool {
        if target.c_sum <= own_c_sum {
            return false;
        }
        self.responses.insert(peer.to_string(), target);
        true
    }

    /// Peer with the highest advertised `c_sum` above `own_c_sum`; ties go
    /// to the lowest peer id.
    pub fn best_response(&self, own_c_sum: u64) -> Option<(PeerId, SyncTarget)> {
        self.responses
            .iter()
            .filter(|(_, t)| t.c_sum > own_c_sum)
            .fold(None, |best: Option<(&PeerId, &SyncTarget)>, (peer, t)| match best {
                Some((_, b)) if b.c_sum >= t.c_sum => best,
                _ => Some((peer, t)),
            })
            .map(|(peer, t)| (peer.clone(), *t))
    }

    pub fn forget(&mut self, peer: &str) {
        self.responses.remove(peer);
    }

    /// Open a session with `peer` and return the first header request.
    pub fn start(
        &mut self,
        peer: PeerId,
        target: SyncTarget,
        now: i64,
        config: &ChainConfig,
    ) -> Message {
        let session = SyncSession::new(peer, target, now, config);
        info!(
            "SYNC {} started with {} towards block {} c_sum {}",
            session.id, session.peer, target.block_number, target.c_sum
        );
        let request = session.header_request(config);
        self.round_open = false;
        self.session = Some(session);
        request
    }

    pub fn session(&self) -> Option<&SyncSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut SyncSession> {
        self.session.as_mut()
    }

    /// Session with `peer`, if that is the one running.
    pub fn session_with(&mut self, peer: &str) -> Option<&mut SyncSession> {
        self.session.as_mut().filter(|s| s.peer == peer)
    }

    /// End the running session and drop its peer's response.
    pub fn finish(&mut self) -> Option<SyncSession> {
        let session = self.session.take()?;
        self.responses.remove(&session.peer);
        Some(session)
    }
}
