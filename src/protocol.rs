//! Protocol types for communication between update modules and the controller.
//!
//! All communication uses newline-delimited JSON (one JSON object per line).
//! An update module keeps one connection open for its whole lifetime: it pushes
//! status reports up, the controller pushes lifecycle commands down. There is no
//! handshake; the first status report is the registration.

use serde::{Deserialize, Serialize};

/// Update state reported by an update module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UmState {
    /// Nothing pending
    #[default]
    Idle,
    /// Update image downloaded and verified, ready to start
    Prepared,
    /// Update started, waiting for apply or revert
    Updated,
    /// Last operation failed, see the report's error
    Failed,
}

impl std::fmt::Display for UmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UmState::Idle => write!(f, "IDLE"),
            UmState::Prepared => write!(f, "PREPARED"),
            UmState::Updated => write!(f, "UPDATED"),
            UmState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Status report sent from an update module to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Identifier the update module registers under
    pub um_id: String,
    pub um_state: UmState,
    /// Error description, empty when the last operation succeeded
    #[serde(default)]
    pub error: String,
}

impl StatusReport {
    pub fn new(um_id: impl Into<String>, um_state: UmState) -> Self {
        Self {
            um_id: um_id.into(),
            um_state,
            error: String::new(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }
}

/// Lifecycle commands sent from the controller to an update module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControllerMessage {
    /// Fetch and verify the update image at `url`
    PrepareUpdate { url: String, version: u64 },
    /// Install the prepared update
    StartUpdate,
    /// Commit the installed update
    ApplyUpdate,
    /// Roll back to the previous version
    RevertUpdate,
}

impl ControllerMessage {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            ControllerMessage::PrepareUpdate { .. } => "PrepareUpdate",
            ControllerMessage::StartUpdate => "StartUpdate",
            ControllerMessage::ApplyUpdate => "ApplyUpdate",
            ControllerMessage::RevertUpdate => "RevertUpdate",
        }
    }
}

/// Serializes a message as one protocol line, including the trailing newline.
pub fn encode_line<T: Serialize>(message: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Parses one received line into a status report.
pub fn decode_status(line: &str) -> serde_json::Result<StatusReport> {
    serde_json::from_str(line.trim())
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
