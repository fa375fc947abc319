//! Consumer interface through which the controller reports client activity.

use crate::controller::error::SessionError;
use crate::protocol::UmState;
use tokio::sync::mpsc;

/// Receives client lifecycle notifications from the controller.
///
/// Callbacks are invoked from the per-connection session tasks and must not block.
pub trait UpdateConsumer: Send + Sync {
    /// A new connection was accepted; no identifier is known yet.
    fn registered(&self);

    /// A connection's receive loop ended. `id` is the last identifier seen on
    /// the connection, empty if it never sent a status report.
    fn disconnected(&self, id: &str, cause: &SessionError);

    /// A status report was received.
    fn status(&self, id: &str, state: UmState, error: &str);
}

/// Events mirroring the [`UpdateConsumer`] callbacks, for channel-based consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// A new update module connected.
    Registered,
    /// An update module disconnected.
    Disconnected { id: String, cause: String },
    /// An update module reported its state.
    Status {
        id: String,
        state: UmState,
        error: String,
    },
}

impl UpdateConsumer for mpsc::UnboundedSender<ControllerEvent> {
    fn registered(&self) {
        let _ = self.send(ControllerEvent::Registered);
    }

    fn disconnected(&self, id: &str, cause: &SessionError) {
        let _ = self.send(ControllerEvent::Disconnected {
            id: id.to_string(),
            cause: cause.to_string(),
        });
    }

    fn status(&self, id: &str, state: UmState, error: &str) {
        let _ = self.send(ControllerEvent::Status {
            id: id.to_string(),
            state,
            error: error.to_string(),
        });
    }
}
