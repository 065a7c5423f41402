//! Safe-mode redaction of client-identifying strings in logs

use std::fmt::Display;

/// Replacement for redacted values
pub const REDACTED: &str = "[REDACTED]";

/// Redaction policy, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redactor {
    safe_mode: bool,
}

impl Redactor {
    pub fn new(safe_mode: bool) -> Self {
        Self { safe_mode }
    }

    /// Render `value` for a log line
    pub fn sensitive(&self, value: impl Display) -> String {
        if self.safe_mode {
            REDACTED.to_string()
        } else {
            value.to_string()
        }
    }
}
