//! Connection handle definition
//!
//! The engine's view of a connected socket: who it is, a queue to its
//! writer task, and a token to force it shut. The engine never touches
//! the socket itself.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SendError;
use crate::message::Outbound;
use crate::types::{BanKey, ConnectionId};

/// Handle to one accepted connection
///
/// Cheap to clone; every event from a reader carries one.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique identifier for this connection
    pub id: ConnectionId,
    /// Remote address (IP + port)
    pub peer: SocketAddr,
    /// Engine → writer queue
    outbound: mpsc::Sender<Outbound>,
    /// Cancelled when the connection must close and the queue can't say so
    shutdown: CancellationToken,
}

impl Connection {
    /// Create a new handle for `peer` writing into `outbound`
    pub fn new(peer: SocketAddr, outbound: mpsc::Sender<Outbound>) -> Self {
        Self {
            id: ConnectionId::new(),
            peer,
            outbound,
            shutdown: CancellationToken::new(),
        }
    }

    /// Address key used for bans
    pub fn ban_key(&self) -> BanKey {
        BanKey::from(self.peer)
    }

    /// Token the connection task watches for a forced close
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Queue bytes for this connection without waiting
    ///
    /// Fails if the queue is full or the writer is gone; the caller decides
    /// whether that matters.
    pub fn send(&self, data: Bytes) -> Result<(), SendError> {
        self.enqueue(Outbound::Data(data))
    }

    /// Close the connection, writing `notice` first when possible
    ///
    /// If the queue has no room the connection is shut down without the
    /// notice.
    pub fn close(&self, notice: Option<Bytes>) {
        if self.enqueue(Outbound::Close { notice }).is_err() {
            self.shutdown.cancel();
        }
    }

    fn enqueue(&self, frame: Outbound) -> Result<(), SendError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}
