//! Plaintext Multi-Client TCP Chat Relay Library
//!
//! Clients connect over raw TCP and send text; every accepted message is
//! relayed to every other connected client. Clients that send malformed
//! text or send too fast collect strikes, and too many strikes ban their
//! IP address for a while.
//!
//! # Features
//! - Line or raw-chunk message framing
//! - Per-client rate limiting with strikes
//! - Temporary IP bans
//! - Safe-mode redaction of client addresses in logs
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning all sessions and bans
//! - Each connection has a `handler` task that turns socket reads into
//!   `Event`s and drains its own bounded outbound queue
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use multichat::{listener, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let tcp = listener::bind(&config).await?;
//!     listener::serve(tcp, config).await;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod listener;
pub mod message;
pub mod policy;
pub mod redact;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use broadcast::{broadcast, BroadcastReport};
pub use client::Connection;
pub use codec::ChatCodec;
pub use config::{Cli, Config, Framing};
pub use error::{AppError, ConfigError, SendError};
pub use handler::{handle_connection, ConnectionSettings};
pub use message::Outbound;
pub use policy::{Policy, Verdict, Violation};
pub use redact::Redactor;
pub use registry::{BanRegistry, SessionRegistry};
pub use server::{ChatServer, Event};
pub use session::Session;
pub use types::{BanKey, ConnectionId};
