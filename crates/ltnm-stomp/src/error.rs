//! Error codes for the STOMP client.

use thiserror::Error;

/// Everything that can go wrong between the client and the event service.
///
/// The `Unexpected*` variants flag conditions that a well-behaved client
/// and server never produce; seeing one means a bug on one of the two
/// sides, not a transient network condition.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum StompClientError {
    /// `connect` was driven from a state other than idle.
    #[error("the client is not idle; connect is only valid once")]
    NotIdle,

    /// The WebSocket connection could not be established.
    #[error("could not connect to the WebSockets server")]
    CouldNotConnectToWebSocketsServer,

    /// The STOMP connection frame could not be handed to the transport.
    #[error("could not send the STOMP frame")]
    CouldNotSendStompFrame,

    /// The SUBSCRIBE frame could not be handed to the transport.
    #[error("could not send the SUBSCRIBE frame")]
    CouldNotSendSubscribeFrame,

    /// The WebSocket close handshake failed, or there was no connection to
    /// close.
    #[error("could not close the WebSockets connection")]
    CouldNotCloseWebSocketsConnection,

    /// A frame failed validation on construction or parse.
    #[error("unexpected: could not create a valid STOMP frame")]
    UnexpectedCouldNotCreateValidFrame,

    /// A MESSAGE frame carried a content type other than the one the
    /// subscription streams.
    #[error("unexpected message content type")]
    UnexpectedMessageContentType,

    /// A MESSAGE frame's destination does not match the subscription it was
    /// delivered to.
    #[error("unexpected subscription mismatch")]
    UnexpectedSubscriptionMismatch,

    /// The server dropped the connection.
    #[error("the WebSockets server disconnected")]
    WebSocketsServerDisconnected,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
