//! # ltnm-monitor
//!
//! The live transport network monitor: the coordinator that composes the
//! STOMP client with the transport-network store.
//!
//! Lifecycle: [`monitor::NetworkMonitor::configure`] validates the inputs,
//! obtains and parses the network-layout document, and builds (without
//! connecting) the STOMP client; [`monitor::NetworkMonitor::run`] drives
//! the connection and folds every outcome into the last recorded error;
//! [`monitor::NetworkMonitor::stop`] cancels a run without clearing it.
//!
//! - **`config`** – the plain configuration struct.
//! - **`download`** – HTTPS download of the network-layout document,
//!   validated against the configured CA certificate.
//! - **`monitor`** – the coordinator itself.

pub mod config;
pub mod download;
pub mod monitor;

pub use config::MonitorConfig;
pub use monitor::{MonitorError, NetworkMonitor, StopHandle};
