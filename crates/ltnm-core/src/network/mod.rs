//! Transport-network domain module.
//!
//! - **`event`** – Passenger events as they arrive on the wire
//!   (`{datetime, passenger_event, station_id}`).
//! - **`transport_network`** – The in-memory network of stations, lines,
//!   and routes, built from a network-layout document, accumulating
//!   per-station passenger counts.

pub mod event;
pub mod transport_network;

pub use event::{PassengerEvent, PassengerEventKind};
pub use transport_network::{NetworkError, NetworkLayout, TransportNetwork};
