//! ChatServer Actor implementation
//!
//! The central actor that owns all chat state: sessions and bans.
//! Connection tasks talk to it only through the event channel, so every
//! state change happens here, one event at a time, in arrival order.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::broadcast::broadcast;
use crate::client::Connection;
use crate::config::Config;
use crate::message::{ban_remaining_notice, BANNED_NOTICE};
use crate::policy::{Policy, Verdict};
use crate::redact::Redactor;
use crate::registry::{BanRegistry, SessionRegistry};
use crate::session::Session;
use crate::types::BanKey;

/// How often expired ban records are swept
const BAN_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Events sent from connection tasks to the ChatServer actor
#[derive(Debug)]
pub enum Event {
    /// New connection accepted
    Connected { conn: Connection },
    /// Connection closed or errored
    Disconnected { conn: Connection },
    /// Bytes received from a connection
    Message { conn: Connection, payload: Bytes },
}

/// The main ChatServer actor
///
/// Processes events from connection tasks. Handlers never await: all
/// writes go through per-connection queues, so one slow peer cannot stall
/// the loop.
pub struct ChatServer {
    /// Live sessions: peer address -> Session
    sessions: SessionRegistry,
    /// Banned addresses: IP -> ban time
    bans: BanRegistry,
    /// Acceptance rules
    policy: Policy,
    /// Safe-mode log redaction
    redactor: Redactor,
    /// Event receiver channel
    receiver: mpsc::Receiver<Event>,
}

impl ChatServer {
    /// Create a new ChatServer with the given event receiver
    pub fn new(config: &Config, receiver: mpsc::Receiver<Event>) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            bans: BanRegistry::new(config.ban_duration()),
            policy: Policy::from_config(config),
            redactor: Redactor::new(config.safe_mode),
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes events until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        let mut prune = time::interval(BAN_PRUNE_INTERVAL);
        prune.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                event = self.receiver.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                _ = prune.tick() => {
                    let pruned = self.bans.prune(Instant::now());
                    if pruned > 0 {
                        debug!(pruned, "Pruned expired bans");
                    }
                }
            }
        }

        info!("ChatServer shutting down");
    }

    /// Process a single event
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Connected { conn } => self.handle_connected(conn),
            Event::Disconnected { conn } => self.handle_disconnected(conn),
            Event::Message { conn, payload } => self.handle_message(conn, payload),
        }
    }

    #[cfg(test)]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Handle new connection
    fn handle_connected(&mut self, conn: Connection) {
        let now = Instant::now();
        let client = self.redactor.sensitive(conn.peer);

        if let Some(remaining) = self.bans.remaining(conn.ban_key(), now) {
            info!(
                client = %client,
                remaining_secs = remaining.as_secs_f64(),
                "Refused banned client"
            );
            conn.close(Some(Bytes::from(ban_remaining_notice(remaining))));
            return;
        }

        info!(client = %client, "Client connected");
        if let Some(old) = self.sessions.insert(Session::new(conn, now)) {
            warn!(client = %client, "Replaced session for reused address");
            old.conn.close(None);
        }
        debug!(sessions = self.sessions.len(), "Session registered");
    }

    /// Handle disconnection
    fn handle_disconnected(&mut self, conn: Connection) {
        let client = self.redactor.sensitive(conn.peer);
        match self.sessions.remove(&conn.peer, conn.id) {
            Some(_) => info!(client = %client, "Client disconnected"),
            None => debug!(client = %client, "Disconnect without session"),
        }
        debug!(sessions = self.sessions.len(), "Session removed");
    }

    /// Handle received bytes
    fn handle_message(&mut self, conn: Connection, payload: Bytes) {
        let now = Instant::now();

        let Some(session) = self.sessions.get_mut(&conn.peer, conn.id) else {
            // Banned or already gone; the reader hasn't noticed yet.
            debug!(client = %self.redactor.sensitive(conn.peer), "Message without session");
            conn.close(None);
            return;
        };

        match self.policy.evaluate(session, &payload, now) {
            Verdict::Accepted => {
                let text = String::from_utf8_lossy(&payload);
                info!(
                    client = %self.redactor.sensitive(conn.peer),
                    message = %text.trim_end(),
                    "Client sent message"
                );
                let report = broadcast(&self.sessions, conn.id, &payload);
                debug!(
                    delivered = report.delivered,
                    dropped = report.dropped,
                    "Broadcast message"
                );
            }
            Verdict::Strike { violation, strikes } => {
                debug!(
                    client = %self.redactor.sensitive(conn.peer),
                    ?violation,
                    strikes,
                    "Rejected message"
                );
            }
            Verdict::Ban { violation } => {
                self.ban(conn.ban_key(), now);
                debug!(?violation, "Strike limit reached");
            }
        }
    }

    /// Ban `key` and close every session from it
    fn ban(&mut self, key: BanKey, now: Instant) {
        self.bans.ban(key, now);
        let evicted = self.sessions.remove_by_key(key);

        warn!(
            client = %self.redactor.sensitive(key),
            sessions = evicted.len(),
            "Client banned"
        );

        for session in evicted {
            session
                .conn
                .close(Some(Bytes::from_static(BANNED_NOTICE.as_bytes())));
        }
    }
}
