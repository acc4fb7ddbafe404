//! Broker transport boundary and the in-process implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use sfn_primitives::Tag;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

/// A tagged message exchanged with the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Routing tag.
    pub tag: Tag,
    /// Raw payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Creates a frame.
    #[must_use]
    pub fn new(tag: Tag, payload: impl Into<Bytes>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }
}

/// Errors raised by transports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The broker could not be reached.
    #[error("failed to connect to {addr}: {reason}")]
    Connect {
        /// Broker address.
        addr: String,
        /// Failure detail.
        reason: String,
    },
    /// An operation needed a connection that was not established.
    #[error("transport is not connected")]
    NotConnected,
    /// The inbound side has been closed.
    #[error("transport is closed")]
    Closed,
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Connection to a broker.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Address of the broker this transport targets.
    fn addr(&self) -> &str;

    /// Establishes the connection.
    async fn connect(&self) -> TransportResult<()>;

    /// Sends `payload` under `tag`.
    async fn send(&self, tag: Tag, payload: Bytes) -> TransportResult<()>;

    /// Waits for the next inbound frame. `None` once the stream is exhausted.
    async fn recv(&self) -> Option<Frame>;
}

/// In-process transport backed by an unbounded queue.
///
/// Inbound frames are fed with [`LocalTransport::push`]; outbound frames are
/// recorded and can be inspected with [`LocalTransport::sent`].
pub struct LocalTransport {
    addr: String,
    connect_error: Option<String>,
    connected: AtomicBool,
    inbound_tx: Mutex<Option<UnboundedSender<Frame>>>,
    inbound_rx: tokio::sync::Mutex<UnboundedReceiver<Frame>>,
    sent: Mutex<Vec<Frame>>,
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("addr", &self.addr)
            .field("connected", &self.is_connected())
            .field("sent", &lock(&self.sent).len())
            .finish_non_exhaustive()
    }
}

impl LocalTransport {
    /// Creates a transport for `addr`.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            addr: addr.into(),
            connect_error: None,
            connected: AtomicBool::new(false),
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: tokio::sync::Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Makes every [`Transport::connect`] call fail with `reason`.
    #[must_use]
    pub fn with_connect_error(mut self, reason: impl Into<String>) -> Self {
        self.connect_error = Some(reason.into());
        self
    }

    /// Queues an inbound frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] after [`LocalTransport::close_inbound`].
    pub fn push(&self, tag: Tag, payload: impl Into<Bytes>) -> TransportResult<()> {
        let frame = Frame::new(tag, payload);
        let guard = lock(&self.inbound_tx);
        let sender = guard.as_ref().ok_or(TransportError::Closed)?;
        debug!(addr = %self.addr, tag = %frame.tag, bytes = frame.payload.len(), "queue inbound frame");
        sender.send(frame).map_err(|_| TransportError::Closed)
    }

    /// Ends the inbound stream. Frames already queued are still delivered.
    pub fn close_inbound(&self) {
        lock(&self.inbound_tx).take();
    }

    /// Returns `true` after a successful connect.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Returns the frames sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Frame> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> TransportResult<()> {
        if let Some(reason) = &self.connect_error {
            return Err(TransportError::Connect {
                addr: self.addr.clone(),
                reason: reason.clone(),
            });
        }
        self.connected.store(true, Ordering::Release);
        info!(addr = %self.addr, "transport connected");
        Ok(())
    }

    async fn send(&self, tag: Tag, payload: Bytes) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        info!(
            addr = %self.addr,
            %tag,
            data = %String::from_utf8_lossy(&payload),
            "transport write"
        );
        lock(&self.sent).push(Frame { tag, payload });
        Ok(())
    }

    async fn recv(&self) -> Option<Frame> {
        self.inbound_rx.lock().await.recv().await
    }
}

// Guarded values are plain collections that stay consistent across a panic.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_queued_frames_then_ends() {
        let transport = LocalTransport::new("localhost:9000");
        transport.push(Tag::new(0x29), "one").unwrap();
        transport.push(Tag::new(0x29), "two").unwrap();
        transport.close_inbound();

        assert_eq!(transport.recv().await, Some(Frame::new(Tag::new(0x29), "one")));
        assert_eq!(transport.recv().await, Some(Frame::new(Tag::new(0x29), "two")));
        assert_eq!(transport.recv().await, None);
        assert_eq!(transport.push(Tag::new(0x29), "late"), Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn send_requires_connection_and_records_frames() {
        let transport = LocalTransport::new("localhost:9000");
        let err = transport
            .send(Tag::new(0x30), Bytes::from_static(b"x"))
            .await
            .expect_err("not connected");
        assert_eq!(err, TransportError::NotConnected);

        transport.connect().await.unwrap();
        transport
            .send(Tag::new(0x30), Bytes::from_static(b"hello"))
            .await
            .unwrap();

        assert_eq!(transport.sent(), vec![Frame::new(Tag::new(0x30), "hello")]);
    }

    #[tokio::test]
    async fn connect_error_is_reported() {
        let transport = LocalTransport::new("zipper:9000").with_connect_error("refused");
        let err = transport.connect().await.expect_err("configured to fail");

        assert!(matches!(err, TransportError::Connect { ref addr, .. } if addr == "zipper:9000"));
        assert!(!transport.is_connected());
    }
}
