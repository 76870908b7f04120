//! The in-memory transport network.
//!
//! The network is built once from a network-layout JSON document and then
//! accumulates passenger counts as events stream in. Layout validation is
//! strict: duplicate identifiers and routes referencing unknown stations
//! are rejected at construction time, so event recording can assume a
//! consistent graph.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use thiserror::Error;

use crate::network::event::{PassengerEvent, PassengerEventKind};

/// Errors that can occur when constructing the network from a layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    /// Two stations in the layout share an id.
    #[error("duplicate station id: {0}")]
    DuplicateStation(String),

    /// Two lines in the layout share an id.
    #[error("duplicate line id: {0}")]
    DuplicateLine(String),

    /// Two routes in the layout share an id.
    #[error("duplicate route id: {0}")]
    DuplicateRoute(String),

    /// A route references a station the layout does not define.
    #[error("route {route_id} references unknown station {station_id}")]
    UnknownStation {
        route_id: String,
        station_id: String,
    },

    /// A route belongs to a line other than the one declaring it.
    #[error("route {route_id} declares line {declared} but belongs to line {line_id}")]
    LineMismatch {
        route_id: String,
        declared: String,
        line_id: String,
    },

    /// The layout defines no stations at all.
    #[error("layout defines no stations")]
    EmptyLayout,
}

// ── Layout document ───────────────────────────────────────────────────────────

/// One station entry in the layout document.
#[derive(Debug, Clone, Deserialize)]
pub struct StationSpec {
    pub station_id: String,
    pub name: String,
}

/// One route entry in the layout document.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    pub route_id: String,
    pub direction: String,
    pub line_id: String,
    pub start_station_id: String,
    pub end_station_id: String,
    pub route_stops: Vec<String>,
}

/// One line entry in the layout document.
#[derive(Debug, Clone, Deserialize)]
pub struct LineSpec {
    pub line_id: String,
    pub name: String,
    pub routes: Vec<RouteSpec>,
}

/// The network-layout document as downloaded from the event service.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkLayout {
    pub stations: Vec<StationSpec>,
    pub lines: Vec<LineSpec>,
}

// ── Network ───────────────────────────────────────────────────────────────────

/// A station with its accumulated passenger count.
#[derive(Debug, Clone)]
struct Station {
    name: String,
    passenger_count: i64,
}

/// A route through the network.
#[derive(Debug, Clone)]
pub struct Route {
    pub route_id: String,
    pub direction: String,
    pub line_id: String,
    pub start_station_id: String,
    pub end_station_id: String,
    pub stops: Vec<String>,
}

/// A line grouping one or more routes.
#[derive(Debug, Clone)]
pub struct Line {
    pub line_id: String,
    pub name: String,
    pub routes: Vec<Route>,
}

/// The in-memory transport network: stations, lines, routes, and
/// per-station passenger counts.
#[derive(Debug, Default)]
pub struct TransportNetwork {
    stations: HashMap<String, Station>,
    lines: HashMap<String, Line>,
}

impl TransportNetwork {
    /// Builds the network from a parsed layout document.
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] when the layout is internally
    /// inconsistent; see the enum variants for the rejection cases.
    pub fn from_layout(layout: NetworkLayout) -> Result<Self, NetworkError> {
        if layout.stations.is_empty() {
            return Err(NetworkError::EmptyLayout);
        }

        let mut stations = HashMap::with_capacity(layout.stations.len());
        for spec in layout.stations {
            if stations.contains_key(&spec.station_id) {
                return Err(NetworkError::DuplicateStation(spec.station_id));
            }
            stations.insert(
                spec.station_id,
                Station {
                    name: spec.name,
                    passenger_count: 0,
                },
            );
        }

        let mut lines = HashMap::with_capacity(layout.lines.len());
        let mut route_ids: HashSet<String> = HashSet::new();
        for line_spec in layout.lines {
            if lines.contains_key(&line_spec.line_id) {
                return Err(NetworkError::DuplicateLine(line_spec.line_id));
            }
            let mut routes = Vec::with_capacity(line_spec.routes.len());
            for route_spec in line_spec.routes {
                if !route_ids.insert(route_spec.route_id.clone()) {
                    return Err(NetworkError::DuplicateRoute(route_spec.route_id));
                }
                if route_spec.line_id != line_spec.line_id {
                    return Err(NetworkError::LineMismatch {
                        route_id: route_spec.route_id,
                        declared: route_spec.line_id,
                        line_id: line_spec.line_id,
                    });
                }
                for station_id in route_spec
                    .route_stops
                    .iter()
                    .chain([&route_spec.start_station_id, &route_spec.end_station_id])
                {
                    if !stations.contains_key(station_id) {
                        return Err(NetworkError::UnknownStation {
                            route_id: route_spec.route_id,
                            station_id: station_id.clone(),
                        });
                    }
                }
                routes.push(Route {
                    route_id: route_spec.route_id,
                    direction: route_spec.direction,
                    line_id: route_spec.line_id,
                    start_station_id: route_spec.start_station_id,
                    end_station_id: route_spec.end_station_id,
                    stops: route_spec.route_stops,
                });
            }
            lines.insert(
                line_spec.line_id.clone(),
                Line {
                    line_id: line_spec.line_id,
                    name: line_spec.name,
                    routes,
                },
            );
        }

        Ok(Self { stations, lines })
    }

    /// Applies one passenger event to the network.
    ///
    /// Returns `false` when the station is unknown; the network is left
    /// unchanged in that case.
    pub fn record_passenger_event(&mut self, event: &PassengerEvent) -> bool {
        let Some(station) = self.stations.get_mut(&event.station_id) else {
            return false;
        };
        match event.kind {
            PassengerEventKind::In => station.passenger_count += 1,
            PassengerEventKind::Out => station.passenger_count -= 1,
        }
        true
    }

    /// The accumulated passenger count for a station, or `None` if the
    /// station is not part of the network.
    pub fn get_passenger_count(&self, station_id: &str) -> Option<i64> {
        self.stations
            .get(station_id)
            .map(|station| station.passenger_count)
    }

    /// Whether the network contains the given station.
    pub fn has_station(&self, station_id: &str) -> bool {
        self.stations.contains_key(station_id)
    }

    /// The human-readable name of a station.
    pub fn station_name(&self, station_id: &str) -> Option<&str> {
        self.stations.get(station_id).map(|s| s.name.as_str())
    }

    /// Number of stations in the network.
    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// A line by id.
    pub fn line(&self, line_id: &str) -> Option<&Line> {
        self.lines.get(line_id)
    }

    /// Number of lines in the network.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
