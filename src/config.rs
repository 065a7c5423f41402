//! Startup configuration
//!
//! Layers, lowest precedence first: built-in defaults, an optional JSON
//! config file, command-line flags. The result is validated once and then
//! fixed for the life of the process.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::error::ConfigError;

/// How a connection's byte stream is cut into messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// One message per `\n`-terminated line (delimiter kept)
    Line,
    /// One message per socket read
    Chunk,
}

/// Relay configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Interface to bind
    pub host: String,
    /// TCP port to listen on
    pub port: u16,
    /// Redact client addresses in logs
    pub safe_mode: bool,
    /// Minimum time between two accepted messages of one client
    pub message_interval_secs: f64,
    /// How long a ban lasts
    pub ban_duration_secs: f64,
    /// Strikes that trigger a ban
    pub strike_limit: u32,
    /// How incoming bytes are cut into messages
    pub framing: Framing,
    /// Largest single message; longer input is fragmented
    pub max_message_bytes: usize,
    /// Event channel capacity; readers wait when it is full
    pub event_queue_capacity: usize,
    /// Per-connection outbound queue; frames are dropped when it is full
    pub outbound_queue_capacity: usize,
    /// Per-write socket timeout
    pub write_timeout_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 6969,
            safe_mode: true,
            message_interval_secs: 1.0,
            ban_duration_secs: 600.0,
            strike_limit: 10,
            framing: Framing::Line,
            max_message_bytes: 4096,
            event_queue_capacity: 1024,
            outbound_queue_capacity: 64,
            write_timeout_secs: 10.0,
        }
    }
}

impl Config {
    /// Load a JSON config file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Address string for `TcpListener::bind`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn message_interval(&self) -> Duration {
        Duration::from_secs_f64(self.message_interval_secs)
    }

    pub fn ban_duration(&self) -> Duration {
        Duration::from_secs_f64(self.ban_duration_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.write_timeout_secs)
    }

    /// Reject values the relay cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_secs("message_interval_secs", self.message_interval_secs)?;
        check_secs("ban_duration_secs", self.ban_duration_secs)?;
        check_secs("write_timeout_secs", self.write_timeout_secs)?;
        if self.write_timeout_secs == 0.0 {
            return Err(ConfigError::Invalid(
                "write_timeout_secs must be > 0".into(),
            ));
        }
        if self.strike_limit == 0 {
            return Err(ConfigError::Invalid("strike_limit must be >= 1".into()));
        }
        for (name, value) in [
            ("max_message_bytes", self.max_message_bytes),
            ("event_queue_capacity", self.event_queue_capacity),
            ("outbound_queue_capacity", self.outbound_queue_capacity),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be >= 1")));
            }
        }
        Ok(())
    }
}

fn check_secs(name: &str, value: f64) -> Result<(), ConfigError> {
    // Duration::from_secs_f64 panics outside this range.
    if !value.is_finite() || value < 0.0 || value >= u64::MAX as f64 {
        return Err(ConfigError::Invalid(format!(
            "{name} must be a finite, non-negative number of seconds (got {value})"
        )));
    }
    Ok(())
}

/// Command-line interface
#[derive(Parser, Debug, Default)]
#[command(name = "multichat", version, about = "Plaintext TCP chat relay")]
pub struct Cli {
    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// TCP port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Redact client addresses in logs
    #[arg(long, value_name = "BOOL", action = clap::ArgAction::Set)]
    pub safe_mode: Option<bool>,

    /// Minimum seconds between two accepted messages of one client
    #[arg(long, value_name = "SECS")]
    pub message_interval: Option<f64>,

    /// Ban length in seconds
    #[arg(long, value_name = "SECS")]
    pub ban_duration: Option<f64>,

    /// Strikes before a ban
    #[arg(long)]
    pub strike_limit: Option<u32>,

    /// Message framing
    #[arg(long, value_enum)]
    pub framing: Option<Framing>,

    /// Largest single message in bytes
    #[arg(long)]
    pub max_message_bytes: Option<usize>,

    /// Event channel capacity
    #[arg(long)]
    pub event_queue_capacity: Option<usize>,

    /// Per-connection outbound queue capacity
    #[arg(long)]
    pub outbound_queue_capacity: Option<usize>,

    /// Socket write timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub write_timeout: Option<f64>,
}

impl Cli {
    /// Resolve defaults, config file and flags into a validated `Config`
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(safe_mode) = self.safe_mode {
            config.safe_mode = safe_mode;
        }
        if let Some(secs) = self.message_interval {
            config.message_interval_secs = secs;
        }
        if let Some(secs) = self.ban_duration {
            config.ban_duration_secs = secs;
        }
        if let Some(limit) = self.strike_limit {
            config.strike_limit = limit;
        }
        if let Some(framing) = self.framing {
            config.framing = framing;
        }
        if let Some(max) = self.max_message_bytes {
            config.max_message_bytes = max;
        }
        if let Some(cap) = self.event_queue_capacity {
            config.event_queue_capacity = cap;
        }
        if let Some(cap) = self.outbound_queue_capacity {
            config.outbound_queue_capacity = cap;
        }
        if let Some(secs) = self.write_timeout {
            config.write_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}
