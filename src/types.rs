//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers for type safety:
//! - `ConnectionId`: UUID-based unique connection identifier
//! - `BanKey`: the address a ban applies to (IP only, port ignored)

use std::net::{IpAddr, SocketAddr};

use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4. Two connections that happen to reuse the same
/// `SocketAddr` still get distinct ids, so a late disconnect for the
/// old one can be told apart from the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ban scope for a client
///
/// All connections from one IP share ban state, whatever their port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BanKey(pub IpAddr);

impl From<SocketAddr> for BanKey {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.ip())
    }
}

impl std::fmt::Display for BanKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
