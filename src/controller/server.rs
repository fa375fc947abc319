//! TCP server accepting update module connections.

use crate::config::ServerConfig;
use crate::controller::consumer::UpdateConsumer;
use crate::controller::dispatcher::Dispatcher;
use crate::controller::error::ServerError;
use crate::controller::registry::ConnectionRegistry;
use crate::controller::session::{run_session, SessionContext};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Back-off after a failed accept (e.g. out of file descriptors).
const ACCEPT_RETRY_DELAY_MS: u64 = 100;

/// A running update controller.
///
/// The accept loop and every session run on background tasks; dropping the
/// server stops them.
pub struct Server {
    local_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Server {
    /// Binds the configured endpoint and starts accepting connections.
    ///
    /// Returns as soon as the listener is bound.
    pub async fn start(
        config: &ServerConfig,
        consumer: Arc<dyn UpdateConsumer>,
    ) -> Result<Self, ServerError> {
        let bind_error = |source| ServerError::Bind {
            endpoint: config.endpoint.clone(),
            source,
        };

        let listener = TcpListener::bind(&config.endpoint)
            .await
            .map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        tracing::info!(addr = %local_addr, idle_timeout = ?config.idle_timeout, "Listening");

        let registry = Arc::new(ConnectionRegistry::new());
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        let ctx = SessionContext {
            registry: registry.clone(),
            consumer,
            cancel: cancel.clone(),
            idle_timeout: config.idle_timeout,
        };
        tracker.spawn(accept_loop(listener, ctx, tracker.clone()));

        Ok(Self {
            local_addr,
            dispatcher: Dispatcher::new(registry.clone()),
            registry,
            cancel,
            tracker,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Stops accepting connections and terminates every session.
    ///
    /// Safe to call repeatedly. Sessions finish their disconnection handling on
    /// their own tasks; use [`Server::shutdown`] to wait for them.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!(addr = %self.local_addr, "Stopping server");
        }
        self.cancel.cancel();
        self.tracker.close();
    }

    /// Stops the server and waits until every session has been torn down.
    pub async fn shutdown(self) {
        self.stop();
        self.tracker.wait().await;
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn accept_loop(listener: TcpListener, ctx: SessionContext, tracker: TaskTracker) {
    let mut next_conn_id: u64 = 0;

    loop {
        let accepted = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, addr)) => {
                next_conn_id += 1;
                let conn_id = next_conn_id;
                tracing::info!(conn = conn_id, peer = %addr, "Connection accepted");

                let ctx = ctx.clone();
                tracker.spawn(async move {
                    let (reader, writer) = stream.into_split();
                    run_session(conn_id, addr.to_string(), reader, writer, &ctx).await;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                tokio::time::sleep(Duration::from_millis(ACCEPT_RETRY_DELAY_MS)).await;
            }
        }
    }

    tracing::debug!("Accept loop stopped");
}
