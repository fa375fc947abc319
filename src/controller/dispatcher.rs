//! Lifecycle commands addressed to a connected update module by identifier.

use crate::controller::error::DispatchError;
use crate::controller::registry::ConnectionRegistry;
use crate::protocol::ControllerMessage;
use std::sync::Arc;

/// Sends lifecycle commands through the connection registry.
///
/// Commands are fire-and-forget: success means the line was written to the
/// connection, and the module confirms through a later status report. A failed
/// send leaves the registry untouched; only the receive loop unregisters.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Asks the module to fetch and verify the update image at `url`.
    pub async fn prepare_update(
        &self,
        id: &str,
        url: &str,
        version: u64,
    ) -> Result<(), DispatchError> {
        self.send(
            id,
            ControllerMessage::PrepareUpdate {
                url: url.to_string(),
                version,
            },
        )
        .await
    }

    pub async fn start_update(&self, id: &str) -> Result<(), DispatchError> {
        self.send(id, ControllerMessage::StartUpdate).await
    }

    pub async fn apply_update(&self, id: &str) -> Result<(), DispatchError> {
        self.send(id, ControllerMessage::ApplyUpdate).await
    }

    pub async fn revert_update(&self, id: &str) -> Result<(), DispatchError> {
        self.send(id, ControllerMessage::RevertUpdate).await
    }

    /// Identifiers that can currently be addressed, sorted.
    pub async fn connected(&self) -> Vec<String> {
        self.registry.ids().await
    }

    /// Looks up `id` and writes `message` to its connection.
    pub async fn send(&self, id: &str, message: ControllerMessage) -> Result<(), DispatchError> {
        let handle = self
            .registry
            .get(id)
            .await
            .ok_or_else(|| DispatchError::ClientNotFound(id.to_string()))?;

        handle
            .send(&message)
            .await
            .map_err(|source| DispatchError::SendFailed {
                id: id.to_string(),
                source,
            })?;

        tracing::debug!(id = %id, conn = handle.conn_id(), command = message.name(), "Command sent");
        Ok(())
    }
}
