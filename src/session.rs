//! Session struct definition
//!
//! Per-connection chat state owned by the event loop.

use tokio::time::Instant;

use crate::client::Connection;

/// Per-client chat state
///
/// Lives from an accepted `Connected` event until disconnect or ban.
#[derive(Debug)]
pub struct Session {
    /// Connection this session belongs to
    pub conn: Connection,
    /// When the session was created
    pub connected_at: Instant,
    /// Time of the last accepted message (None until the first one)
    pub last_message: Option<Instant>,
    /// Consecutive rejected messages
    pub strikes: u32,
}

impl Session {
    /// Create a new session for `conn` started at `now`
    pub fn new(conn: Connection, now: Instant) -> Self {
        Self {
            conn,
            connected_at: now,
            last_message: None,
            strikes: 0,
        }
    }

    /// Record an accepted message
    pub fn accept(&mut self, now: Instant) {
        self.last_message = Some(now);
        self.strikes = 0;
    }

    /// Record a rejected message, returning the new strike count
    pub fn strike(&mut self) -> u32 {
        self.strikes = self.strikes.saturating_add(1);
        self.strikes
    }
}
