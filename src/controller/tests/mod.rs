//! Tests for the update controller.
//!
//! Session and dispatcher tests run over in-memory duplex pipes; server tests
//! bind real loopback listeners and connect as update modules over TCP.


use crate::controller::registry::ConnectionRegistry;
use crate::controller::session::SessionContext;
use crate::controller::{ControllerEvent, UpdateConsumer};
use crate::protocol::{encode_line, ControllerMessage, StatusReport};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How long a test waits for an expected event before failing.
const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Consumer that forwards every callback into a channel the test can await.
pub fn recording_consumer() -> (
    Arc<dyn UpdateConsumer>,
    mpsc::UnboundedReceiver<ControllerEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), rx)
}

pub fn test_context(
    idle_timeout: Option<Duration>,
) -> (SessionContext, mpsc::UnboundedReceiver<ControllerEvent>) {
    let (consumer, rx) = recording_consumer();
    let ctx = SessionContext {
        registry: Arc::new(ConnectionRegistry::new()),
        consumer,
        cancel: CancellationToken::new(),
        idle_timeout,
    };
    (ctx, rx)
}

pub async fn next_event(events: &mut mpsc::UnboundedReceiver<ControllerEvent>) -> ControllerEvent {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for controller event")
        .expect("event channel closed")
}

/// Update module side of a connection.
pub struct TestModule<R, W> {
    reader: BufReader<R>,
    writer: W,
}

impl<R, W> TestModule<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    pub async fn send_status(&mut self, report: &StatusReport) {
        let line = encode_line(report).unwrap();
        self.send_raw(&line).await;
    }

    pub async fn send_raw(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    pub async fn recv_command(&mut self) -> ControllerMessage {
        let mut line = String::new();
        let n = tokio::time::timeout(EVENT_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for command")
            .unwrap();
        assert!(n > 0, "connection closed before a command arrived");
        serde_json::from_str(line.trim()).unwrap()
    }

    /// Reads until the controller closes the connection; returns true on EOF.
    pub async fn wait_closed(&mut self) -> bool {
        let mut line = String::new();
        loop {
            line.clear();
            match tokio::time::timeout(EVENT_TIMEOUT, self.reader.read_line(&mut line)).await {
                Ok(Ok(0)) | Ok(Err(_)) => return true,
                Ok(Ok(_)) => continue,
                Err(_) => return false,
            }
        }
    }
}

pub type DuplexModule =
    TestModule<tokio::io::ReadHalf<tokio::io::DuplexStream>, tokio::io::WriteHalf<tokio::io::DuplexStream>>;

pub type TcpModule =
    TestModule<tokio::net::tcp::OwnedReadHalf, tokio::net::tcp::OwnedWriteHalf>;

impl TcpModule {
    pub async fn connect(addr: std::net::SocketAddr) -> Self {
        let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }
}
