//! Message acceptance policy
//!
//! Pure decision logic: validity, rate limit, strikes, ban promotion.
//! No I/O and no registry access; the event loop acts on the verdict.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::Config;
use crate::session::Session;

/// Why a message was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Payload is not well-formed UTF-8
    Malformed,
    /// Sent sooner than the message interval allows
    TooFast,
}

/// Outcome of evaluating one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Broadcast it
    Accepted,
    /// Dropped; session now has `strikes` strikes
    Strike { violation: Violation, strikes: u32 },
    /// Strike limit reached; ban the author's address
    Ban { violation: Violation },
}

/// Rate limit and strike policy
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    message_interval: Duration,
    strike_limit: u32,
}

impl Policy {
    pub fn new(message_interval: Duration, strike_limit: u32) -> Self {
        Self {
            message_interval,
            strike_limit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.message_interval(), config.strike_limit)
    }

    /// Check a payload against the policy and update the session
    ///
    /// Validity is checked before the rate limit; either failure is one
    /// strike. Accepting resets strikes and stamps `now`.
    pub fn evaluate(&self, session: &mut Session, payload: &[u8], now: Instant) -> Verdict {
        let violation = if !is_valid(payload) {
            Some(Violation::Malformed)
        } else if self.too_fast(session, now) {
            Some(Violation::TooFast)
        } else {
            None
        };

        match violation {
            None => {
                session.accept(now);
                Verdict::Accepted
            }
            Some(violation) => {
                let strikes = session.strike();
                if strikes >= self.strike_limit {
                    Verdict::Ban { violation }
                } else {
                    Verdict::Strike { violation, strikes }
                }
            }
        }
    }

    fn too_fast(&self, session: &Session, now: Instant) -> bool {
        match session.last_message {
            Some(last) => now.saturating_duration_since(last) < self.message_interval,
            None => false,
        }
    }
}

/// Well-formed text check
pub fn is_valid(payload: &[u8]) -> bool {
    std::str::from_utf8(payload).is_ok()
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio::time;

    use super::*;
    use crate::client::Connection;

    fn policy() -> Policy {
        Policy::new(Duration::from_secs(1), 10)
    }

    fn session() -> Session {
        let (tx, _rx) = mpsc::channel(1);
        let conn = Connection::new("127.0.0.1:4000".parse().unwrap(), tx);
        Session::new(conn, Instant::now())
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid(b"hello\n"));
        assert!(is_valid("héllo wörld".as_bytes()));
        assert!(!is_valid(&[0xff, 0xfe]));
        // truncated multi-byte sequence
        assert!(!is_valid(&[0xe2, 0x82]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_message_accepted() {
        let mut session = session();
        assert_eq!(
            policy().evaluate(&mut session, b"hi", Instant::now()),
            Verdict::Accepted
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit() {
        let policy = policy();
        let mut session = session();

        assert_eq!(
            policy.evaluate(&mut session, b"hi", Instant::now()),
            Verdict::Accepted
        );

        time::advance(Duration::from_millis(100)).await;
        assert_eq!(
            policy.evaluate(&mut session, b"bye", Instant::now()),
            Verdict::Strike {
                violation: Violation::TooFast,
                strikes: 1
            }
        );

        time::advance(Duration::from_secs(2)).await;
        assert_eq!(
            policy.evaluate(&mut session, b"yo", Instant::now()),
            Verdict::Accepted
        );
        assert_eq!(session.strikes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exact_interval_is_allowed() {
        let policy = policy();
        let mut session = session();

        policy.evaluate(&mut session, b"a", Instant::now());
        time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            policy.evaluate(&mut session, b"b", Instant::now()),
            Verdict::Accepted
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_message_does_not_move_rate_window() {
        let policy = policy();
        let mut session = session();

        policy.evaluate(&mut session, b"a", Instant::now());
        time::advance(Duration::from_millis(600)).await;
        assert!(matches!(
            policy.evaluate(&mut session, b"b", Instant::now()),
            Verdict::Strike { .. }
        ));
        // 1.2s after the last *accepted* message
        time::advance(Duration::from_millis(600)).await;
        assert_eq!(
            policy.evaluate(&mut session, b"c", Instant::now()),
            Verdict::Accepted
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_is_strike_regardless_of_timing() {
        let policy = policy();
        let mut session = session();

        time::advance(Duration::from_secs(30)).await;
        assert_eq!(
            policy.evaluate(&mut session, &[0xc3], Instant::now()),
            Verdict::Strike {
                violation: Violation::Malformed,
                strikes: 1
            }
        );
        assert!(session.last_message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_strike_limit_bans() {
        let policy = policy();
        let mut session = session();

        for expected in 1..10 {
            assert_eq!(
                policy.evaluate(&mut session, &[0xff], Instant::now()),
                Verdict::Strike {
                    violation: Violation::Malformed,
                    strikes: expected
                }
            );
        }
        assert_eq!(
            policy.evaluate(&mut session, &[0xff], Instant::now()),
            Verdict::Ban {
                violation: Violation::Malformed
            }
        );
    }
}
