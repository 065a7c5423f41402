//! Server → client wire frames
//!
//! The relay has no structured protocol: peers receive the literal bytes
//! other clients sent, plus two plain-text ban notices.

use std::time::Duration;

use bytes::Bytes;

/// Frame queued for a connection's writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Raw bytes relayed from another client
    Data(Bytes),
    /// Write the notice (if any), then close the connection
    Close { notice: Option<Bytes> },
}

/// Notice sent when a client hits the strike limit
pub const BANNED_NOTICE: &str = "You are banned\n";

/// Notice sent to a banned address trying to reconnect
pub fn ban_remaining_notice(remaining: Duration) -> String {
    format!("You are banned: {:.1} secs left\n", remaining.as_secs_f64())
}
