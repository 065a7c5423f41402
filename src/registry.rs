//! Session and ban registries
//!
//! Plain single-owner maps. Only the event loop holds them, so there is
//! no locking here.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::Instant;

use crate::session::Session;
use crate::types::{BanKey, ConnectionId};

/// Live sessions keyed by peer address (IP + port)
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SocketAddr, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, returning the one it replaced (if any)
    pub fn insert(&mut self, session: Session) -> Option<Session> {
        self.sessions.insert(session.conn.peer, session)
    }

    #[cfg(test)]
    pub fn get(&self, peer: &SocketAddr) -> Option<&Session> {
        self.sessions.get(peer)
    }

    /// Session for `peer`, only if it belongs to connection `id`
    pub fn get_mut(&mut self, peer: &SocketAddr, id: ConnectionId) -> Option<&mut Session> {
        self.sessions.get_mut(peer).filter(|s| s.conn.id == id)
    }

    /// Remove the session for `peer` if it belongs to connection `id`
    ///
    /// A stale id (the address was reused by a newer connection) leaves
    /// the newer session alone.
    pub fn remove(&mut self, peer: &SocketAddr, id: ConnectionId) -> Option<Session> {
        match self.sessions.get(peer) {
            Some(session) if session.conn.id == id => self.sessions.remove(peer),
            _ => None,
        }
    }

    /// Remove and return every session from `key`'s address
    pub fn remove_by_key(&mut self, key: BanKey) -> Vec<Session> {
        let peers: Vec<SocketAddr> = self
            .sessions
            .keys()
            .filter(|peer| BanKey::from(**peer) == key)
            .copied()
            .collect();
        peers
            .iter()
            .filter_map(|peer| self.sessions.remove(peer))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Ban records keyed by IP
///
/// Records expire after `duration`; expired ones are pruned when looked up.
#[derive(Debug)]
pub struct BanRegistry {
    bans: HashMap<BanKey, Instant>,
    duration: Duration,
}

impl BanRegistry {
    pub fn new(duration: Duration) -> Self {
        Self {
            bans: HashMap::new(),
            duration,
        }
    }

    /// Ban `key` starting at `now` (replaces an older record)
    pub fn ban(&mut self, key: BanKey, now: Instant) {
        self.bans.insert(key, now);
    }

    /// Time left on `key`'s ban, or None if not banned
    pub fn remaining(&mut self, key: BanKey, now: Instant) -> Option<Duration> {
        let banned_at = *self.bans.get(&key)?;
        let elapsed = now.saturating_duration_since(banned_at);
        if elapsed < self.duration {
            Some(self.duration - elapsed)
        } else {
            self.bans.remove(&key);
            None
        }
    }

    /// Drop all expired records, returning how many were removed
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.bans.len();
        let duration = self.duration;
        self.bans
            .retain(|_, banned_at| now.saturating_duration_since(*banned_at) < duration);
        before - self.bans.len()
    }

    /// Number of stored records, expired or not
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.bans.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.bans.is_empty()
    }
}
