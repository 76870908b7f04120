//! # ltnm-core
//!
//! Shared library for the live transport network monitor containing the
//! STOMP 1.2 frame model and codec, plus the transport-network domain
//! entities (stations, lines, routes, passenger events).
//!
//! This crate is used by both the STOMP client and the monitor application.
//! It has zero dependencies on OS APIs, network sockets, or async runtimes:
//! everything here is pure data and pure functions, which keeps the codec
//! and the domain model trivially unit-testable.
//!
//! - **`stomp`** – How STOMP frames travel over the wire. A frame is a
//!   command line, a header block, a blank line, a body, and a terminating
//!   NUL octet. The codec parses and serializes frames and enforces the
//!   per-command required-header policy at construction time, so a
//!   malformed frame can never reach the transport.
//!
//! - **`network`** – The in-memory transport network: stations, lines, and
//!   routes loaded from a network-layout document, accumulating per-station
//!   passenger counts as events stream in.

pub mod network;
pub mod stomp;

// Re-export the most-used types at the crate root so callers can write
// `ltnm_core::Frame` instead of `ltnm_core::stomp::frame::Frame`.
pub use network::event::{PassengerEvent, PassengerEventKind};
pub use network::transport_network::{NetworkError, NetworkLayout, TransportNetwork};
pub use stomp::codec::{parse, serialize, FrameError};
pub use stomp::frame::{Frame, HeaderName, StompCommand};
