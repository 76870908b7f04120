//! Passenger events.
//!
//! Events arrive as JSON bodies on the `/passengers` subscription:
//!
//! ```json
//! {
//!     "datetime": "2020-11-01T07:18:50.234000Z",
//!     "passenger_event": "in",
//!     "station_id": "station_0"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a passenger entered or left a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassengerEventKind {
    /// A passenger entered the station.
    In,
    /// A passenger left the station.
    Out,
}

/// One passenger event applied to the transport network.
///
/// The station id is opaque here; the transport network decides whether it
/// is valid when the event is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerEvent {
    /// Absolute wall-clock instant of the event.
    #[serde(rename = "datetime")]
    pub timestamp: DateTime<Utc>,
    /// Entry or exit.
    #[serde(rename = "passenger_event")]
    pub kind: PassengerEventKind,
    /// The station the event happened at.
    pub station_id: String,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
