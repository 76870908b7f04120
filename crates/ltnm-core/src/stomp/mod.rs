//! STOMP 1.2 protocol module: frame model and wire codec.
//!
//! A STOMP frame is `(command, headers, body)`:
//!
//! 1. **Command line** – one of a fixed, closed set of commands
//!    (`STOMP`, `CONNECTED`, `SUBSCRIBE`, `MESSAGE`, …).
//! 2. **Header block** – an ordered sequence of `name:value` pairs.
//!    Duplicate names are allowed on the wire; the first occurrence wins
//!    on access. Values carry the STOMP 1.2 escape sequences.
//! 3. **Body** – an opaque octet string, bounded by `content-length` when
//!    that header is present.
//!
//! The frame terminates with a NUL octet. One WebSocket text frame carries
//! exactly one STOMP frame including its NUL.
//!
//! - **`frame`** – Command and header types, the [`Frame`](frame::Frame)
//!   struct, and constructors that enforce the required-header policy.
//! - **`codec`** – Parse and serialize logic with tagged parse errors.

pub mod codec;
pub mod frame;

pub use codec::{parse, serialize, FrameError};
pub use frame::{Frame, HeaderName, StompCommand};
