//! The transport seam between the STOMP client and the network.
//!
//! [`StompTransport`] is the exact capability set the client needs:
//! connect, send one text frame, close, and a stream of inbound events.
//! Keeping the seam this narrow means the whole protocol state machine can
//! be driven by the in-memory [`mock::MockStompTransport`] in tests, while
//! production uses [`websocket::WebSocketTransport`] over TLS.

pub mod mock;
pub mod tls;
pub mod websocket;

use async_trait::async_trait;
use thiserror::Error;

pub use mock::{MockBehavior, MockStompTransport};
pub use websocket::WebSocketTransport;

/// Errors surfaced by a transport implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("failed to establish the WebSocket connection: {0}")]
    Connect(String),

    /// A frame could not be sent.
    #[error("failed to send on the WebSocket connection: {0}")]
    Send(String),

    /// The close handshake failed.
    #[error("failed to close the WebSocket connection: {0}")]
    Close(String),

    /// The operation requires an established connection.
    #[error("the transport is not connected")]
    NotConnected,

    /// The TLS client configuration could not be built.
    #[error("TLS configuration error: {0}")]
    Tls(String),
}

/// An inbound event from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One complete text frame arrived.
    Message(String),
    /// The connection is gone. `clean` distinguishes an orderly close
    /// handshake from a dropped connection; `reason` is opaque detail for
    /// the logs.
    Disconnected { clean: bool, reason: String },
}

/// The capability set the STOMP client requires from its transport.
///
/// One WebSocket text frame carries exactly one STOMP frame, so `send`
/// and [`TransportEvent::Message`] both move whole frames. All four
/// operations suspend; none of them blocks a thread.
#[async_trait]
pub trait StompTransport: Send {
    /// Establishes the connection, including any TLS and WebSocket
    /// handshakes.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Sends one text frame.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Starts the close handshake.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Waits for the next inbound event.
    ///
    /// After a [`TransportEvent::Disconnected`] has been returned, every
    /// later call returns `Disconnected` again immediately.
    async fn next_event(&mut self) -> TransportEvent;
}
