//! Update controller: the control side of the update-module protocol.
//!
//! ## Architecture
//!
//! - **Server (`server.rs`)**: binds the listen endpoint and spawns one session
//!   task per accepted connection.
//! - **Session (`session.rs`)**: receive loop registering the connection under
//!   the identifier from each status report.
//! - **Registry (`registry.rs`)**: identifier → connection handle table.
//! - **Dispatcher (`dispatcher.rs`)**: prepare/start/apply/revert commands
//!   routed through the registry.
//! - **Consumer (`consumer.rs`)**: callbacks the presentation layer implements.

pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod registry;
pub mod server;
pub mod session;

#[cfg(test)]
mod tests;

pub use consumer::{ControllerEvent, UpdateConsumer};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, ServerError, SessionError};
pub use server::Server;
