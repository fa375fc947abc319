//! Error types for the update controller.

use thiserror::Error;

/// Errors returned while starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen endpoint could not be bound
    #[error("can't bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by the lifecycle commands.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No live connection is registered under this identifier
    #[error("client {0} not found")]
    ClientNotFound(String),
    /// The command could not be written to the client's connection
    #[error("can't send to client {id}: {source}")]
    SendFailed {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

impl DispatchError {
    /// Identifier of the client the failed command was addressed to.
    pub fn client_id(&self) -> &str {
        match self {
            DispatchError::ClientNotFound(id) => id,
            DispatchError::SendFailed { id, .. } => id,
        }
    }
}

/// Reasons a session's receive loop terminated.
///
/// Always terminal for the connection; surfaced only through
/// [`UpdateConsumer::disconnected`](super::UpdateConsumer::disconnected).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection closed by peer")]
    Closed,
    #[error("receive failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid status report: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("status line exceeds {0} bytes")]
    LineTooLong(usize),
    #[error("no status report for {0:?}")]
    IdleTimeout(std::time::Duration),
    #[error("server stopped")]
    Shutdown,
}
