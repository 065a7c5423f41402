//! Broadcast router
//!
//! Fans an accepted message out to every session except its author.
//! Delivery is best-effort: a full or closed peer queue is counted and
//! skipped, never retried.

use bytes::Bytes;
use tracing::debug;

use crate::registry::SessionRegistry;
use crate::types::ConnectionId;

/// Result of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers whose queue accepted the message
    pub delivered: usize,
    /// Peers whose queue was full or closed
    pub dropped: usize,
}

/// Queue `payload` for every session except `author`
pub fn broadcast(
    sessions: &SessionRegistry,
    author: ConnectionId,
    payload: &Bytes,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for session in sessions.iter().filter(|s| s.conn.id != author) {
        match session.conn.send(payload.clone()) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                debug!(connection = %session.conn.id, error = %e, "Dropped broadcast frame");
                report.dropped += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    use super::*;
    use crate::client::Connection;
    use crate::message::Outbound;
    use crate::session::Session;

    fn register(
        registry: &mut SessionRegistry,
        peer: &str,
        capacity: usize,
    ) -> (ConnectionId, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity);
        let conn = Connection::new(peer.parse().unwrap(), tx);
        let id = conn.id;
        registry.insert(Session::new(conn, Instant::now()));
        (id, rx)
    }

    #[tokio::test]
    async fn test_broadcast_skips_author() {
        let mut registry = SessionRegistry::new();
        let (author, mut author_rx) = register(&mut registry, "10.0.0.1:1", 8);
        let (_, mut b_rx) = register(&mut registry, "10.0.0.2:1", 8);
        let (_, mut c_rx) = register(&mut registry, "10.0.0.3:1", 8);

        let payload = Bytes::from_static(b"hello\n");
        let report = broadcast(&registry, author, &payload);

        assert_eq!(
            report,
            BroadcastReport {
                delivered: 2,
                dropped: 0
            }
        );
        assert_eq!(b_rx.try_recv().unwrap(), Outbound::Data(payload.clone()));
        assert_eq!(c_rx.try_recv().unwrap(), Outbound::Data(payload));
        assert!(author_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_peer_does_not_block_others() {
        let mut registry = SessionRegistry::new();
        let (author, _author_rx) = register(&mut registry, "10.0.0.1:1", 8);
        let (_, closed_rx) = register(&mut registry, "10.0.0.2:1", 8);
        let (_, mut full_rx) = register(&mut registry, "10.0.0.3:1", 1);
        let (_, mut ok_rx) = register(&mut registry, "10.0.0.4:1", 8);
        drop(closed_rx);

        broadcast(&registry, author, &Bytes::from_static(b"first"));
        let report = broadcast(&registry, author, &Bytes::from_static(b"second"));

        // closed peer fails both times, full peer fails the second time
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 1,
                dropped: 2
            }
        );
        assert_eq!(
            ok_rx.try_recv().unwrap(),
            Outbound::Data(Bytes::from_static(b"first"))
        );
        assert_eq!(
            ok_rx.try_recv().unwrap(),
            Outbound::Data(Bytes::from_static(b"second"))
        );
        assert_eq!(
            full_rx.try_recv().unwrap(),
            Outbound::Data(Bytes::from_static(b"first"))
        );
        assert!(full_rx.try_recv().is_err());
    }
}
