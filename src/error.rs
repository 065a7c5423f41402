//! Error types for the chat relay
//!
//! Defines application-level errors, configuration errors and
//! outbound queue send errors. Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors
///
/// Everything here is fatal for whatever produced it: startup for
/// `Config`/`Bind`, a single connection for `Io`/`ChannelSend`.
/// Policy violations by clients are never errors.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Could not bind the listening socket
    #[error("Could not listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Channel send error (fatal - event loop is gone)
    #[error("Channel send error")]
    ChannelSend,
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for `Config`
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value is out of range
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Outbound queue send errors
///
/// Occurs when the engine tries to queue bytes for a connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The connection's queue is full (slow reader)
    #[error("Outbound queue full")]
    Full,

    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}
