//! Per-connection receive loop.
//!
//! Each accepted connection runs [`run_session`] on its own task. The loop
//! registers the connection under whatever identifier the module reports,
//! forwards every report to the consumer, and on the first receive failure
//! unregisters the connection and reports the disconnection exactly once.

use crate::controller::consumer::UpdateConsumer;
use crate::controller::error::SessionError;
use crate::controller::handle::ClientHandle;
use crate::controller::registry::ConnectionRegistry;
use crate::protocol::{decode_status, StatusReport};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, BufReader};
use tokio_util::sync::CancellationToken;

/// Longest status line accepted, trailing newline included.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Shared state every session task needs.
#[derive(Clone)]
pub struct SessionContext {
    pub registry: Arc<ConnectionRegistry>,
    pub consumer: Arc<dyn UpdateConsumer>,
    pub cancel: CancellationToken,
    pub idle_timeout: Option<Duration>,
}

/// Runs the receive loop for one connection until it fails.
///
/// Returns the cause that ended the session; by then the connection has been
/// removed from the registry and the consumer has been told.
pub async fn run_session<R, W>(
    conn_id: u64,
    peer: String,
    reader: R,
    writer: W,
    ctx: &SessionContext,
) -> SessionError
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
{
    ctx.consumer.registered();

    let handle = Arc::new(ClientHandle::new(conn_id, peer, writer));
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    let mut current_id: Option<String> = None;

    let cause = loop {
        let report = match read_report(&mut reader, &mut line, ctx).await {
            Ok(report) => report,
            Err(e) => break e,
        };

        register(&handle, &mut current_id, &report.um_id, ctx).await;

        tracing::debug!(
            conn = conn_id,
            id = %report.um_id,
            state = %report.um_state,
            error = %report.error,
            "Status received"
        );
        ctx.consumer
            .status(&report.um_id, report.um_state, &report.error);
    };

    handle.close().await;
    if let Some(id) = &current_id {
        ctx.registry.remove_if_owned(id, conn_id).await;
    }

    let id = current_id.unwrap_or_default();
    tracing::info!(conn = conn_id, id = %id, peer = %handle.peer(), cause = %cause, "Client disconnected");
    ctx.consumer.disconnected(&id, &cause);

    cause
}

/// Points `id` at this connection, dropping a stale entry if the module renamed itself.
async fn register(
    handle: &Arc<ClientHandle>,
    current_id: &mut Option<String>,
    id: &str,
    ctx: &SessionContext,
) {
    if current_id.as_deref() != Some(id) {
        if let Some(old) = current_id.take() {
            ctx.registry.remove_if_owned(&old, handle.conn_id()).await;
        }
        *current_id = Some(id.to_string());
    }

    if let Some(previous) = ctx.registry.put(id, handle.clone()).await {
        if previous.conn_id() != handle.conn_id() {
            tracing::warn!(
                id = %id,
                old_conn = previous.conn_id(),
                new_conn = handle.conn_id(),
                "Client id taken over by another connection"
            );
        }
    }
}

/// Reads the next non-blank line and decodes it as a status report.
async fn read_report<R>(
    reader: &mut BufReader<R>,
    line: &mut String,
    ctx: &SessionContext,
) -> Result<StatusReport, SessionError>
where
    R: AsyncRead + Unpin,
{
    loop {
        line.clear();

        // One byte over the limit is enough to tell an oversized line apart.
        let mut limited = (&mut *reader).take(MAX_LINE_BYTES as u64 + 1);
        let read = limited.read_line(line);
        let n = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(SessionError::Shutdown),
            result = within(ctx.idle_timeout, read) => result?,
        };

        if n == 0 {
            return Err(SessionError::Closed);
        }
        if n > MAX_LINE_BYTES {
            return Err(SessionError::LineTooLong(MAX_LINE_BYTES));
        }
        if line.trim().is_empty() {
            continue;
        }

        return decode_status(line).map_err(SessionError::from);
    }
}

async fn within<F>(limit: Option<Duration>, read: F) -> Result<usize, SessionError>
where
    F: Future<Output = std::io::Result<usize>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, read).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SessionError::IdleTimeout(limit)),
        },
        None => Ok(read.await?),
    }
}
