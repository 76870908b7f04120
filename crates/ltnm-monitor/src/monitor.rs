//! The network-monitor coordinator.
//!
//! The monitor owns the transport network and the STOMP client and is the
//! only component that initiates lifecycle transitions:
//!
//! 1. [`NetworkMonitor::configure`] validates the inputs, obtains and
//!    parses the network-layout document, builds the network, and builds
//!    the STOMP client. No network I/O towards the event service happens
//!    yet.
//! 2. [`NetworkMonitor::run`] connects, subscribes to `/passengers`, and
//!    applies every passenger event to the network, folding outcomes into
//!    the last recorded error until the connection ends or the run is
//!    stopped.
//! 3. [`NetworkMonitor::stop`] cancels a run; the last recorded error is
//!    deliberately left intact so the caller can still read it.
//!
//! Resilience policy: event parse failures and rejected events are
//! recorded and logged but never end the run; only transport and
//! subscription faults (or an explicit stop) do.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

use ltnm_core::{NetworkLayout, PassengerEvent, TransportNetwork};
use ltnm_stomp::transport::WebSocketTransport;
use ltnm_stomp::{Credentials, StompClient, StompConfig, StompEvent, StompHandle, StompTransport};

use crate::config::MonitorConfig;
use crate::download::download_file;

/// Endpoint of the STOMP WebSocket service.
const NETWORK_EVENTS_ENDPOINT: &str = "/network-events";
/// Endpoint the network-layout document is served from.
const NETWORK_LAYOUT_ENDPOINT: &str = "/network-layout.json";
/// Destination of the passenger-event subscription.
const PASSENGER_EVENTS_ENDPOINT: &str = "/passengers";

/// Error codes for the monitor process.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// The configured CA certificate file does not exist.
    #[error("the CA certificate file is missing")]
    MissingCaCertFile,

    /// A network-layout path was given but the file does not exist.
    #[error("the network layout file is missing")]
    MissingNetworkLayoutFile,

    /// The network-layout document could not be downloaded.
    #[error("failed to download the network layout file")]
    FailedNetworkLayoutFileDownload,

    /// The network-layout document is empty or not valid JSON.
    #[error("failed to parse the network layout file")]
    FailedNetworkLayoutFileParsing,

    /// The transport network rejected the layout.
    #[error("failed to construct the transport network")]
    FailedTransportNetworkConstruction,

    /// The STOMP client could not establish its connection.
    #[error("could not connect to the STOMP server")]
    CouldNotConnectToStompClient,

    /// The passenger-event subscription could not be established.
    #[error("could not subscribe to passenger events")]
    CouldNotSubscribeToPassengerEvents,

    /// A passenger-event body was not valid JSON. Non-fatal.
    #[error("could not parse a passenger event")]
    CouldNotParsePassengerEvent,

    /// The transport network rejected a passenger event. Non-fatal.
    #[error("could not record a passenger event")]
    CouldNotRecordPassengerEvent,

    /// The STOMP connection ended.
    #[error("the STOMP client disconnected")]
    StompClientDisconnected,
}

/// A client built by `configure`, waiting for the first `run` to connect.
struct PendingClient {
    client: StompClient,
    credentials: Credentials,
}

/// Cancels a running monitor from another task (e.g. a Ctrl-C handler).
#[derive(Clone)]
pub struct StopHandle {
    shutdown: Arc<Notify>,
}

impl StopHandle {
    /// Stops the monitor's run loop. The last recorded error is preserved.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }
}

/// The live transport network monitor.
pub struct NetworkMonitor {
    network: TransportNetwork,
    last_error: Option<MonitorError>,
    pending: Option<PendingClient>,
    handle: Option<StompHandle>,
    events: Option<mpsc::Receiver<StompEvent>>,
    shutdown: Arc<Notify>,
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkMonitor {
    /// Creates an unconfigured monitor.
    pub fn new() -> Self {
        Self {
            network: TransportNetwork::default(),
            last_error: None,
            pending: None,
            handle: None,
            events: None,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Sets the monitor up: sanity checks, layout acquisition and parsing,
    /// network construction, client construction. Each step is terminal on
    /// failure. The event-service connection itself is only dialed by the
    /// first [`run`](Self::run).
    pub async fn configure(&mut self, config: MonitorConfig) -> Result<(), MonitorError> {
        let transport = WebSocketTransport::new(
            config.url.clone(),
            config.port,
            NETWORK_EVENTS_ENDPOINT,
            config.ca_cert_file.clone(),
        );
        self.configure_with_transport(config, Box::new(transport))
            .await
    }

    /// [`configure`](Self::configure) with an explicit transport, so tests
    /// can drive the full lifecycle against the mock.
    pub async fn configure_with_transport(
        &mut self,
        config: MonitorConfig,
        transport: Box<dyn StompTransport>,
    ) -> Result<(), MonitorError> {
        info!("configuring the network monitor");

        // Sanity checks.
        if !config.ca_cert_file.exists() {
            error!("could not find {}", config.ca_cert_file.display());
            return Err(MonitorError::MissingCaCertFile);
        }
        if let Some(path) = &config.network_layout_file {
            if !path.exists() {
                error!("could not find {}", path.display());
                return Err(MonitorError::MissingNetworkLayoutFile);
            }
        }

        // Obtain the network-layout document, downloading it when no local
        // path was configured.
        let layout_file: PathBuf = match &config.network_layout_file {
            Some(path) => path.clone(),
            None => {
                let destination = std::env::temp_dir().join("network-layout.json");
                let url = format!("https://{}{}", config.url, NETWORK_LAYOUT_ENDPOINT);
                info!("downloading the network layout to {}", destination.display());
                if let Err(e) = download_file(&url, &destination, &config.ca_cert_file).await {
                    error!("could not download {url}: {e}");
                    return Err(MonitorError::FailedNetworkLayoutFileDownload);
                }
                destination
            }
        };

        // Parse the layout.
        info!("loading the network layout from {}", layout_file.display());
        let layout: NetworkLayout = match tokio::fs::read_to_string(&layout_file).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(layout) => layout,
                Err(e) => {
                    error!("could not parse {}: {e}", layout_file.display());
                    return Err(MonitorError::FailedNetworkLayoutFileParsing);
                }
            },
            Err(e) => {
                error!("could not read {}: {e}", layout_file.display());
                return Err(MonitorError::FailedNetworkLayoutFileParsing);
            }
        };

        // Build the network representation.
        info!("constructing the transport network");
        self.network = match TransportNetwork::from_layout(layout) {
            Ok(network) => network,
            Err(e) => {
                error!("the transport network rejected the layout: {e}");
                return Err(MonitorError::FailedTransportNetworkConstruction);
            }
        };

        // Build the STOMP client. Nothing connects until run() is called.
        info!("constructing the STOMP client for {NETWORK_EVENTS_ENDPOINT}");
        let client = StompClient::new(StompConfig { host: config.url.clone() }, transport);
        self.pending = Some(PendingClient {
            client,
            credentials: Credentials {
                username: config.username,
                password: config.password,
            },
        });

        info!("network monitor configured");
        Ok(())
    }

    /// Drives the monitor until the connection ends or [`stop`](Self::stop)
    /// is called. Clears the last recorded error first.
    pub async fn run(&mut self) {
        info!("running the live transport network monitor");
        self.last_error = None;

        // First run: spawn the connection task built by configure().
        if let Some(pending) = self.pending.take() {
            let (handle, events) = pending.client.connect(pending.credentials);
            self.handle = Some(handle);
            self.events = Some(events);
        }

        loop {
            let step = {
                let Some(events) = self.events.as_mut() else {
                    warn!("run called before a successful configure");
                    return;
                };
                tokio::select! {
                    event = events.recv() => Some(event),
                    _ = self.shutdown.notified() => None,
                }
            };
            match step {
                // stop() requested: leave last_error untouched.
                None => {
                    info!("stopping the live transport network monitor");
                    break;
                }
                // The connection task is gone; the run drains naturally.
                Some(None) => {
                    debug!("the client event stream ended");
                    break;
                }
                Some(Some(event)) => self.handle_event(event).await,
            }
        }
    }

    /// [`run`](Self::run) under a wall-clock deadline; on expiry the run
    /// is cancelled as if [`stop`](Self::stop) had been called.
    pub async fn run_for(&mut self, deadline: Duration) {
        if tokio::time::timeout(deadline, self.run()).await.is_err() {
            debug!("run deadline of {deadline:?} expired");
        }
    }

    /// Cancels an in-progress run without clearing the last recorded
    /// error.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    /// A handle other tasks can use to stop the monitor.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// The last error recorded before the run loop drained, or `None` when
    /// the run was clean.
    pub fn last_error(&self) -> Option<MonitorError> {
        self.last_error
    }

    /// The internal network representation.
    pub fn network(&self) -> &TransportNetwork {
        &self.network
    }

    // ── Event handling ───────────────────────────────────────────────────────

    async fn handle_event(&mut self, event: StompEvent) {
        match event {
            StompEvent::Connected => self.on_connect().await,
            StompEvent::ConnectionFailed(e) => {
                error!("STOMP client connection failed: {e}");
                self.last_error = Some(MonitorError::CouldNotConnectToStompClient);
                self.close_client().await;
            }
            StompEvent::Subscribed(id) => {
                info!("subscribed to {PASSENGER_EVENTS_ENDPOINT} as {id}");
            }
            StompEvent::SubscriptionFailed(e) => {
                error!("unable to subscribe to {PASSENGER_EVENTS_ENDPOINT}: {e}");
                self.last_error = Some(MonitorError::CouldNotSubscribeToPassengerEvents);
            }
            StompEvent::Message { body, .. } => self.on_message(&body),
            StompEvent::MessageError { subscription, error } => {
                warn!("discarded a message on subscription {subscription}: {error}");
            }
            StompEvent::Disconnected { error } => {
                match error {
                    Some(e) => error!("STOMP client disconnected: {e}"),
                    None => warn!("STOMP client disconnected"),
                }
                self.last_error = Some(MonitorError::StompClientDisconnected);
            }
        }
    }

    async fn on_connect(&mut self) {
        info!("STOMP client connected");
        info!("subscribing to {PASSENGER_EVENTS_ENDPOINT}");
        let Some(handle) = self.handle.clone() else {
            return;
        };
        let id = handle.subscribe(PASSENGER_EVENTS_ENDPOINT).await;
        if id.is_none() {
            error!("STOMP client subscription failed");
            self.last_error = Some(MonitorError::CouldNotSubscribeToPassengerEvents);
            self.close_client().await;
        }
    }

    fn on_message(&mut self, body: &str) {
        let event: PassengerEvent = match serde_json::from_str(body) {
            Ok(event) => event,
            Err(e) => {
                error!("could not parse passenger event {body:?}: {e}");
                self.last_error = Some(MonitorError::CouldNotParsePassengerEvent);
                return;
            }
        };
        if self.network.record_passenger_event(&event) {
            debug!(
                "recorded {:?} event at {} ({})",
                event.kind, event.station_id, event.timestamp
            );
        } else {
            error!("could not record passenger event at {}", event.station_id);
            self.last_error = Some(MonitorError::CouldNotRecordPassengerEvent);
        }
    }

    async fn close_client(&mut self) {
        if let Some(handle) = &self.handle {
            if let Err(e) = handle.close().await {
                // Expected when the connection never came up; the
                // connection task is already gone.
                debug!("close after failure reported: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_monitor_has_no_error_and_an_empty_network() {
        let monitor = NetworkMonitor::new();
        assert_eq!(monitor.last_error(), None);
        assert_eq!(monitor.network().station_count(), 0);
    }

    #[tokio::test]
    async fn test_run_without_configure_returns_immediately() {
        let mut monitor = NetworkMonitor::new();
        monitor.run().await;
        assert_eq!(monitor.last_error(), None);
    }

    #[tokio::test]
    async fn test_stop_handle_cancels_a_pending_run() {
        // Arrange: a stop requested before run() parks stops it at once.
        let mut monitor = NetworkMonitor::new();
        // Give the monitor an open event channel so run() would otherwise park.
        let (_tx, rx) = mpsc::channel::<StompEvent>(1);
        monitor.events = Some(rx);
        monitor.stop_handle().stop();

        // Act / Assert: completes instead of hanging (the test harness
        // would otherwise time out).
        monitor.run().await;
        assert_eq!(monitor.last_error(), None);
    }

    #[tokio::test]
    async fn test_run_for_expires_without_recording_an_error() {
        let mut monitor = NetworkMonitor::new();
        let (_tx, rx) = mpsc::channel::<StompEvent>(1);
        monitor.events = Some(rx);

        monitor.run_for(Duration::from_millis(20)).await;
        assert_eq!(monitor.last_error(), None);
    }
}
