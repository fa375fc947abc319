//! Send side of one update module connection.

use crate::protocol::{encode_line, ControllerMessage};
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Handle used to push commands to a connected update module.
///
/// Sends from concurrent dispatcher calls are serialized on the writer lock, so
/// lines never interleave. Closing the handle aborts any send that is waiting
/// for the lock or blocked on a peer that stopped reading.
pub struct ClientHandle {
    conn_id: u64,
    peer: String,
    writer: Mutex<BoxedWriter>,
    closed: CancellationToken,
}

impl ClientHandle {
    pub fn new<W>(conn_id: u64, peer: impl Into<String>, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            conn_id,
            peer: peer.into(),
            writer: Mutex::new(Box::new(writer)),
            closed: CancellationToken::new(),
        }
    }

    /// Server-unique id of the connection this handle writes to.
    pub fn conn_id(&self) -> u64 {
        self.conn_id
    }

    /// Remote address of the connection.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Writes one command line and flushes it.
    ///
    /// Fails with `NotConnected` if the handle is closed before the line is
    /// fully written; the line may then have been sent in part.
    pub async fn send(&self, message: &ControllerMessage) -> io::Result<()> {
        let line = encode_line(message)?;

        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(not_connected()),
            result = self.write_line(&line) => result,
        }
    }

    async fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    }

    /// Marks the handle closed and shuts down the write side.
    ///
    /// Pending sends fail right away, so this never waits on a stalled peer.
    pub async fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();

        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection is closed")
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("conn_id", &self.conn_id)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}
