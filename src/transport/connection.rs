//! WebSocket client connection and read loop.
//!
//! [`Connection::connect`] spawns one tokio task that owns the TCP stream
//! for its whole life: connect, upgrade handshake, then a loop that
//! decodes frames from the receive buffer and writes queued text frames.
//!
//! # Event Loop
//!
//! The task never touches caller state. It reports through a
//! single-consumer channel of [`TransportEvent`]s:
//!
//! - [`TransportEvent::Connected`] once the upgrade succeeds
//! - [`TransportEvent::Message`] for every complete text frame
//! - [`TransportEvent::Disconnected`] when the stream ends for any reason
//!   other than a local [`Connection::disconnect`]
//!
//! Pings are answered inside the loop and never surface.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};

use super::Endpoint;
use super::frame::{self, Inbound};
use super::handshake::Handshake;

// ============================================================================
// Constants
// ============================================================================

/// Bytes reserved in the receive buffer before each socket read.
const READ_CHUNK: usize = 64 * 1024;

/// Disconnect reason for a close frame from the peer.
pub const SERVER_CLOSED: &str = "Server closed connection";

// ============================================================================
// Types
// ============================================================================

/// Event posted by the read loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The upgrade handshake succeeded.
    Connected,
    /// One complete text frame.
    Message(String),
    /// The stream is gone, with a human-readable reason.
    Disconnected(String),
}

/// Lifecycle of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// TCP connect in progress.
    Disconnected,
    /// Upgrade request sent, waiting for 101.
    Handshaking,
    /// Frames may flow.
    Open,
    /// Torn down locally or by the peer.
    Closed,
}

// ============================================================================
// Connection
// ============================================================================

/// Client WebSocket connection to the app-server.
///
/// Dropping the connection tears the stream down like
/// [`Connection::disconnect`].
pub struct Connection {
    /// Endpoint this connection dials.
    endpoint: Endpoint,
    /// Outbound text queue drained by the event loop.
    outbound_tx: mpsc::UnboundedSender<String>,
    /// State shared with the event loop.
    state: Arc<Mutex<ConnectionState>>,
    /// The event loop task.
    task: JoinHandle<()>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Dials `endpoint` and spawns the event loop.
    ///
    /// Returns immediately; progress is reported on the returned receiver.
    /// `connect_timeout` bounds TCP connect plus handshake when set.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(
        endpoint: Endpoint,
        connect_timeout: Option<Duration>,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(ConnectionState::Disconnected));

        let task = tokio::spawn(Self::run_event_loop(
            endpoint.clone(),
            connect_timeout,
            outbound_rx,
            events_tx,
            Arc::clone(&state),
        ));

        let connection = Self {
            endpoint,
            outbound_tx,
            state,
            task,
        };

        (connection, events_rx)
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Returns the dialed endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Queues `text` as one masked text frame.
    ///
    /// Silently dropped unless the connection is [`ConnectionState::Open`];
    /// nothing is queued for later.
    pub fn send(&self, text: impl Into<String>) {
        if self.state() != ConnectionState::Open {
            trace!(state = ?self.state(), "Dropping send on non-open connection");
            return;
        }

        if self.outbound_tx.send(text.into()).is_err() {
            trace!("Event loop gone, dropping send");
        }
    }

    /// Tears the stream down immediately.
    ///
    /// Buffered partial frames are discarded and no further events are
    /// delivered. Idempotent.
    pub fn disconnect(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), ConnectionState::Closed);
        self.task.abort();

        if previous != ConnectionState::Closed {
            debug!(endpoint = %self.endpoint, ?previous, "Connection torn down");
        }
    }

    /// Moves the shared state forward unless the connection was closed.
    fn advance(state: &Mutex<ConnectionState>, next: ConnectionState) -> bool {
        let mut current = state.lock();
        if *current == ConnectionState::Closed {
            return false;
        }
        *current = next;
        true
    }

    /// Event loop that owns the socket.
    async fn run_event_loop(
        endpoint: Endpoint,
        connect_timeout: Option<Duration>,
        outbound_rx: mpsc::UnboundedReceiver<String>,
        events_tx: mpsc::UnboundedSender<TransportEvent>,
        state: Arc<Mutex<ConnectionState>>,
    ) {
        let reason = match Self::establish(&endpoint, connect_timeout, &state).await {
            Ok((stream, buffer)) => {
                if !Self::advance(&state, ConnectionState::Open) {
                    return;
                }
                info!(endpoint = %endpoint, "WebSocket connection established");
                let _ = events_tx.send(TransportEvent::Connected);

                Self::pump(stream, buffer, outbound_rx, &events_tx).await
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "WebSocket connection failed");
                Some(e.to_string())
            }
        };

        *state.lock() = ConnectionState::Closed;

        if let Some(reason) = reason {
            debug!(reason = %reason, "Event loop terminated");
            let _ = events_tx.send(TransportEvent::Disconnected(reason));
        } else {
            debug!("Event loop terminated");
        }
    }

    /// Connects and upgrades, optionally bounded by `connect_timeout`.
    async fn establish(
        endpoint: &Endpoint,
        connect_timeout: Option<Duration>,
        state: &Arc<Mutex<ConnectionState>>,
    ) -> Result<(TcpStream, BytesMut)> {
        let attempt = async {
            let mut stream = TcpStream::connect((endpoint.host(), endpoint.port()))
                .await
                .map_err(|e| Error::connection(e.to_string()))?;
            stream.set_nodelay(true)?;
            debug!(endpoint = %endpoint, "TCP connection opened");

            Self::advance(state, ConnectionState::Handshaking);

            let mut buffer = BytesMut::with_capacity(READ_CHUNK);
            Handshake::new()
                .perform(&mut stream, endpoint, &mut buffer)
                .await?;

            Ok::<_, Error>((stream, buffer))
        };

        match connect_timeout {
            Some(limit) => timeout(limit, attempt)
                .await
                .map_err(|_| Error::connection_timeout(limit.as_millis() as u64))?,
            None => attempt.await,
        }
    }

    /// Moves frames until the stream ends.
    ///
    /// Returns the disconnect reason, or `None` when the owning
    /// [`Connection`] went away.
    async fn pump(
        stream: TcpStream,
        mut buffer: BytesMut,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        events_tx: &mpsc::UnboundedSender<TransportEvent>,
    ) -> Option<String> {
        let (mut reader, mut writer) = stream.into_split();

        // Frames that arrived together with the upgrade response
        if let Some(reason) = Self::dispatch(&mut buffer, &mut writer, events_tx).await {
            return Some(reason);
        }

        loop {
            buffer.reserve(READ_CHUNK);

            tokio::select! {
                read = reader.read_buf(&mut buffer) => {
                    match read {
                        Ok(0) => return Some(Error::ConnectionClosed.to_string()),
                        Ok(n) => {
                            trace!(bytes = n, buffered = buffer.len(), "Socket read");
                            if let Some(reason) = Self::dispatch(&mut buffer, &mut writer, events_tx).await {
                                return Some(reason);
                            }
                        }
                        Err(e) => return Some(format!("Read error: {e}")),
                    }
                }

                outbound = outbound_rx.recv() => {
                    let Some(text) = outbound else {
                        return None;
                    };

                    let frame = frame::encode_text(&text);
                    if let Err(e) = writer.write_all(&frame).await {
                        return Some(format!("Write failed: {e}"));
                    }
                    trace!(len = text.len(), "Text frame sent");
                }
            }
        }
    }

    /// Acts on every complete frame in the buffer.
    async fn dispatch(
        buffer: &mut BytesMut,
        writer: &mut OwnedWriteHalf,
        events_tx: &mpsc::UnboundedSender<TransportEvent>,
    ) -> Option<String> {
        let inbound = match frame::drain(buffer) {
            Ok(inbound) => inbound,
            Err(e) => return Some(e.to_string()),
        };

        for item in inbound {
            match item {
                Inbound::Text(text) => {
                    trace!(len = text.len(), "Text frame received");
                    let _ = events_tx.send(TransportEvent::Message(text));
                }

                Inbound::Ping(payload) => {
                    let pong = frame::encode_pong(&payload);
                    if let Err(e) = writer.write_all(&pong).await {
                        return Some(format!("Write failed: {e}"));
                    }
                    trace!(len = payload.len(), "Answered ping");
                }

                Inbound::Close => {
                    debug!("Close frame received");
                    return Some(SERVER_CLOSED.to_string());
                }
            }
        }

        None
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================
