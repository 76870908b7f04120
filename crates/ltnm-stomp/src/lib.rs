//! # ltnm-stomp
//!
//! STOMP 1.2 client over a secure WebSocket transport.
//!
//! The crate has two layers:
//!
//! - **`transport`** – the capability set the client needs from a
//!   transport: connect, send one text frame, close, and a stream of
//!   inbound events. `WebSocketTransport` implements it over TLS with a
//!   caller-supplied CA certificate; `MockStompTransport` implements it
//!   in memory for tests, speaking just enough server-side STOMP to
//!   exercise every client path.
//!
//! - **`client`** – the protocol state machine. [`client::StompClient::connect`]
//!   spawns a connection task that owns the transport, the frame parsing,
//!   and the subscription registry, and posts [`client::StompEvent`]s onto a
//!   channel. The channel consumer is the "user side": notifications arrive
//!   there in order, decoupled from transport progress, so a slow consumer
//!   can never interleave or starve protocol handling.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{Credentials, StompClient, StompConfig, StompEvent, StompHandle, SubscriptionId};
pub use error::StompClientError;
pub use transport::{StompTransport, TransportError, TransportEvent};
