//! The STOMP client: connection task, state machine, subscription registry.
//!
//! # Architecture
//!
//! [`StompClient::connect`] consumes the client and spawns a *connection
//! task* that owns the transport, parses frames, runs the state machine,
//! and keeps the subscription registry. Two channels connect it to the
//! caller:
//!
//! - a **command channel** ([`StompHandle`]) for `subscribe` and `close`;
//! - an **event channel** delivering [`StompEvent`]s in order.
//!
//! The event channel is the user-facing execution context: protocol
//! handling never runs user logic inline, so a slow consumer cannot starve
//! reads and two notifications can never be processed concurrently.
//! Consuming the client in `connect` makes a second connect
//! unrepresentable; the same guard exists at runtime as
//! [`StompClientError::NotIdle`] for completeness.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──connect──► WsConnecting ──transport ok──► StompConnecting
//!   StompConnecting ──CONNECTED──► Connected ──close──► Closing ──► Closed
//!   StompConnecting ──ERROR─────► Closing (transport closed, then Disconnected)
//!   any ──transport lost──► Closed (clean) / Faulted (dirty)
//! ```
//!
//! Every SUBSCRIBE carries a `receipt` equal to its `id`; the server's
//! RECEIPT is matched by `receipt-id` against the registry and promotes
//! the entry exactly once. MESSAGE frames dispatch by their
//! `subscription` header; unknown subscriptions are logged and dropped
//! without a state transition.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use ltnm_core::{Frame, HeaderName, StompCommand};

use crate::error::StompClientError;
use crate::transport::{StompTransport, TransportEvent};

/// Subscription identifier: a UUID in its hyphenated string form.
pub type SubscriptionId = String;

/// Content type the passenger-event subscription streams.
const EXPECTED_CONTENT_TYPE: &str = "application/json";

/// Capacity of the user event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Client-side configuration: the `host` header value for the connection
/// frame.
#[derive(Debug, Clone)]
pub struct StompConfig {
    /// Value of the `host` header in the connection frame, i.e. the server
    /// URL without scheme or port.
    pub host: String,
}

/// The user credential presented in the connection frame.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Notifications delivered on the user event channel, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StompEvent {
    /// The STOMP session is established; `subscribe` may now be called.
    /// Delivered at most once.
    Connected,
    /// The connection could not be established. Delivered at most once,
    /// and never after `Connected`.
    ConnectionFailed(StompClientError),
    /// The server acknowledged a subscription. Delivered exactly once per
    /// successful subscription, before any of its messages.
    Subscribed(SubscriptionId),
    /// A subscription could not be handed to the transport.
    SubscriptionFailed(StompClientError),
    /// A message arrived on a subscription.
    Message {
        subscription: SubscriptionId,
        body: String,
    },
    /// A message arrived but was discarded; the subscription stays live.
    MessageError {
        subscription: SubscriptionId,
        error: StompClientError,
    },
    /// The connection is gone. `None` means an orderly close. Delivered at
    /// most once; no event follows it.
    Disconnected { error: Option<StompClientError> },
}

/// One turn of the connection task's event loop.
enum Step {
    /// A command from a handle, or `None` when every handle is gone.
    Command(Option<Command>),
    /// An event from the transport.
    Transport(TransportEvent),
}

/// Commands from the handle to the connection task.
enum Command {
    Subscribe {
        destination: String,
        reply: oneshot::Sender<Option<SubscriptionId>>,
    },
    Close {
        reply: oneshot::Sender<Result<(), StompClientError>>,
    },
}

/// Handle to a running connection task.
///
/// Cloneable and cheap; dropping every handle makes the task close the
/// transport and exit.
#[derive(Clone)]
pub struct StompHandle {
    commands: mpsc::Sender<Command>,
}

impl StompHandle {
    /// Subscribes to a destination.
    ///
    /// Returns `Some(id)` iff the SUBSCRIBE frame was handed to the
    /// transport; the id is non-empty and unique, and the later
    /// [`StompEvent::Subscribed`] carries the same id. Returns `None` when
    /// the frame could not be sent (a [`StompEvent::SubscriptionFailed`]
    /// explains why) or the connection task is gone.
    pub async fn subscribe(&self, destination: &str) -> Option<SubscriptionId> {
        let (reply, response) = oneshot::channel();
        let command = Command::Subscribe {
            destination: destination.to_string(),
            reply,
        };
        if self.commands.send(command).await.is_err() {
            return None;
        }
        response.await.unwrap_or(None)
    }

    /// Closes the connection: the subscription registry is emptied, then
    /// the transport close handshake runs.
    ///
    /// After an `Ok` no further [`StompEvent::Message`] or
    /// [`StompEvent::Subscribed`] is delivered. Closing a connection that
    /// never came up (or is already gone) reports
    /// [`StompClientError::CouldNotCloseWebSocketsConnection`].
    pub async fn close(&self) -> Result<(), StompClientError> {
        let (reply, response) = oneshot::channel();
        if self.commands.send(Command::Close { reply }).await.is_err() {
            return Err(StompClientError::CouldNotCloseWebSocketsConnection);
        }
        response
            .await
            .unwrap_or(Err(StompClientError::CouldNotCloseWebSocketsConnection))
    }
}

/// A STOMP client bound to a transport, ready to connect.
pub struct StompClient {
    config: StompConfig,
    transport: Box<dyn StompTransport>,
}

impl StompClient {
    /// Creates a client over the given transport. No I/O happens here.
    pub fn new(config: StompConfig, transport: Box<dyn StompTransport>) -> Self {
        Self { config, transport }
    }

    /// Connects to the server and spawns the connection task.
    ///
    /// Consuming `self` makes a second connect unrepresentable. The
    /// returned receiver delivers every user-visible notification in
    /// order; the handle accepts `subscribe` and `close`.
    pub fn connect(
        self,
        credentials: Credentials,
    ) -> (StompHandle, mpsc::Receiver<StompEvent>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let task = ConnectionTask {
            host: self.config.host,
            credentials,
            transport: self.transport,
            state: ConnectionState::Idle,
            subscriptions: HashMap::new(),
            commands: command_rx,
            events: event_tx,
            connect_reported: false,
            disconnect_reported: false,
        };
        tokio::spawn(task.run());

        (StompHandle { commands: command_tx }, event_rx)
    }
}

/// The connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Idle,
    WsConnecting,
    StompConnecting,
    Connected,
    Closing,
    Closed,
    Faulted,
}

/// One registry entry per live subscription.
struct Subscription {
    destination: String,
    /// One-shot flag: flips when the RECEIPT promotes the entry, so
    /// `Subscribed` fires exactly once even if the server repeats itself.
    acknowledged: bool,
}

/// The connection task: owns the transport and the registry, runs the
/// state machine, and posts events to the user channel.
struct ConnectionTask {
    host: String,
    credentials: Credentials,
    transport: Box<dyn StompTransport>,
    state: ConnectionState,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<StompEvent>,
    connect_reported: bool,
    disconnect_reported: bool,
}

impl ConnectionTask {
    async fn run(mut self) {
        if self.state != ConnectionState::Idle {
            self.post(StompEvent::ConnectionFailed(StompClientError::NotIdle))
                .await;
            return;
        }

        // WebSocket connection.
        self.state = ConnectionState::WsConnecting;
        if let Err(e) = self.transport.connect().await {
            error!("transport connect failed: {e}");
            self.state = ConnectionState::Faulted;
            self.post(StompEvent::ConnectionFailed(
                StompClientError::CouldNotConnectToWebSocketsServer,
            ))
            .await;
            return;
        }

        // STOMP connection frame.
        let frame = match Frame::stomp_connect(
            &self.host,
            &self.credentials.username,
            &self.credentials.password,
        ) {
            Ok(frame) => frame,
            Err(e) => {
                error!("could not build the connection frame: {e}");
                self.state = ConnectionState::Faulted;
                self.post(StompEvent::ConnectionFailed(
                    StompClientError::UnexpectedCouldNotCreateValidFrame,
                ))
                .await;
                return;
            }
        };
        if let Err(e) = self.transport.send(frame.to_wire()).await {
            error!("could not send the connection frame: {e}");
            self.state = ConnectionState::Faulted;
            self.post(StompEvent::ConnectionFailed(
                StompClientError::CouldNotSendStompFrame,
            ))
            .await;
            return;
        }
        self.state = ConnectionState::StompConnecting;

        // Event loop: commands from the handle, frames from the wire. The
        // select produces a step value first so its branch futures release
        // their borrows before the step is handled.
        loop {
            let step = tokio::select! {
                command = self.commands.recv() => Step::Command(command),
                event = self.transport.next_event() => Step::Transport(event),
            };
            match step {
                Step::Command(Some(Command::Subscribe { destination, reply })) => {
                    self.handle_subscribe(destination, reply).await;
                }
                Step::Command(Some(Command::Close { reply })) => {
                    self.handle_close(reply).await;
                    break;
                }
                Step::Command(None) => {
                    // Every handle dropped: tear the connection down.
                    debug!("all handles dropped; closing the connection");
                    let _ = self.transport.close().await;
                    self.state = ConnectionState::Closed;
                    break;
                }
                Step::Transport(TransportEvent::Message(text)) => {
                    self.handle_frame(&text).await;
                }
                Step::Transport(TransportEvent::Disconnected { clean, reason }) => {
                    self.handle_disconnect(clean, &reason).await;
                    break;
                }
            }

            if matches!(
                self.state,
                ConnectionState::Closed | ConnectionState::Faulted
            ) {
                break;
            }
        }
    }

    /// Posts an event to the user channel. A send failure means the
    /// receiver is gone; the task winds down on the next loop turn.
    async fn post(&mut self, event: StompEvent) {
        if self.events.send(event).await.is_err() {
            debug!("event receiver dropped");
            self.state = ConnectionState::Closed;
        }
    }

    async fn handle_subscribe(
        &mut self,
        destination: String,
        reply: oneshot::Sender<Option<SubscriptionId>>,
    ) {
        let id: SubscriptionId = Uuid::new_v4().to_string();

        let frame = match Frame::subscribe(&id, &destination) {
            Ok(frame) => frame,
            Err(e) => {
                error!("could not build the SUBSCRIBE frame: {e}");
                // Reply before posting so a caller awaiting the id can
                // never wedge against a full event channel.
                let _ = reply.send(None);
                self.post(StompEvent::SubscriptionFailed(
                    StompClientError::UnexpectedCouldNotCreateValidFrame,
                ))
                .await;
                return;
            }
        };

        if let Err(e) = self.transport.send(frame.to_wire()).await {
            error!("could not send the SUBSCRIBE frame: {e}");
            let _ = reply.send(None);
            self.post(StompEvent::SubscriptionFailed(
                StompClientError::CouldNotSendSubscribeFrame,
            ))
            .await;
            return;
        }

        // The frame is on the wire; the entry is pending until the RECEIPT
        // promotes it. Pending and live entries are indistinguishable on
        // purpose: the receipt id equals the subscription id.
        self.subscriptions.insert(
            id.clone(),
            Subscription {
                destination,
                acknowledged: false,
            },
        );
        let _ = reply.send(Some(id));
    }

    async fn handle_close(&mut self, reply: oneshot::Sender<Result<(), StompClientError>>) {
        // The registry empties before the transport close completes, so no
        // late MESSAGE can be dispatched.
        self.subscriptions.clear();
        match self.transport.close().await {
            Ok(()) => {
                self.state = ConnectionState::Closed;
                let _ = reply.send(Ok(()));
            }
            Err(e) => {
                warn!("transport close failed: {e}");
                self.state = ConnectionState::Faulted;
                let _ = reply.send(Err(StompClientError::CouldNotCloseWebSocketsConnection));
            }
        }
    }

    async fn handle_frame(&mut self, text: &str) {
        let frame = match ltnm_core::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                error!("unparseable frame from the server: {e}");
                if self.state == ConnectionState::StompConnecting && !self.connect_reported {
                    self.connect_reported = true;
                    self.state = ConnectionState::Faulted;
                    self.post(StompEvent::ConnectionFailed(
                        StompClientError::UnexpectedCouldNotCreateValidFrame,
                    ))
                    .await;
                }
                return;
            }
        };

        debug!("received {} frame", frame.command());
        match frame.command() {
            StompCommand::Connected => self.handle_connected(&frame).await,
            StompCommand::Error => self.handle_error(&frame).await,
            StompCommand::Receipt => self.handle_receipt(&frame).await,
            StompCommand::Message => self.handle_message(&frame).await,
            other => warn!("unexpected STOMP command from the server: {other}"),
        }
    }

    async fn handle_connected(&mut self, frame: &Frame) {
        if self.state != ConnectionState::StompConnecting {
            warn!("CONNECTED frame outside the connection handshake; ignored");
            return;
        }
        let version = frame.header(&HeaderName::Version).unwrap_or("<none>");
        info!("STOMP session established (version {version})");
        self.state = ConnectionState::Connected;
        if !self.connect_reported {
            self.connect_reported = true;
            self.post(StompEvent::Connected).await;
        }
    }

    async fn handle_error(&mut self, frame: &Frame) {
        error!("the server returned an error: {}", frame.body());
        if self.state == ConnectionState::StompConnecting {
            // The server rejects the session (bad credentials, usually) and
            // will drop the connection; the disconnect event carries the
            // user-visible outcome. Once a session is up, an ERROR alone
            // does not take it down.
            self.state = ConnectionState::Closing;
            if let Err(e) = self.transport.close().await {
                debug!("close after server error failed: {e}");
            }
        }
    }

    async fn handle_receipt(&mut self, frame: &Frame) {
        let Some(receipt_id) = frame.header(&HeaderName::ReceiptId) else {
            warn!("RECEIPT frame without receipt-id; dropped");
            return;
        };
        let receipt_id = receipt_id.to_string();
        match self.subscriptions.get_mut(&receipt_id) {
            Some(subscription) if !subscription.acknowledged => {
                subscription.acknowledged = true;
                info!("subscription {receipt_id} acknowledged");
                self.post(StompEvent::Subscribed(receipt_id)).await;
            }
            Some(_) => debug!("duplicate RECEIPT for {receipt_id}; dropped"),
            None => warn!("RECEIPT for unknown subscription {receipt_id}; dropped"),
        }
    }

    async fn handle_message(&mut self, frame: &Frame) {
        let Some(subscription_id) = frame.header(&HeaderName::Subscription) else {
            warn!("MESSAGE frame without subscription header; dropped");
            return;
        };
        let subscription_id = subscription_id.to_string();
        let Some(subscription) = self.subscriptions.get(&subscription_id) else {
            warn!("MESSAGE for unknown subscription {subscription_id}; dropped");
            return;
        };

        let destination = frame.header(&HeaderName::Destination).unwrap_or_default();
        if destination != subscription.destination {
            warn!(
                "MESSAGE destination {destination:?} does not match subscription {:?}",
                subscription.destination
            );
            self.post(StompEvent::MessageError {
                subscription: subscription_id,
                error: StompClientError::UnexpectedSubscriptionMismatch,
            })
            .await;
            return;
        }

        if let Some(content_type) = frame.header(&HeaderName::ContentType) {
            if content_type != EXPECTED_CONTENT_TYPE {
                warn!("MESSAGE with unexpected content type {content_type:?}");
                self.post(StompEvent::MessageError {
                    subscription: subscription_id,
                    error: StompClientError::UnexpectedMessageContentType,
                })
                .await;
                return;
            }
        }

        self.post(StompEvent::Message {
            subscription: subscription_id,
            body: frame.body().to_string(),
        })
        .await;
    }

    async fn handle_disconnect(&mut self, clean: bool, reason: &str) {
        if clean {
            info!("connection closed: {reason}");
            self.state = ConnectionState::Closed;
        } else {
            error!("connection lost: {reason}");
            self.state = ConnectionState::Faulted;
        }
        if !self.disconnect_reported {
            self.disconnect_reported = true;
            let error = (!clean).then_some(StompClientError::WebSocketsServerDisconnected);
            self.post(StompEvent::Disconnected { error }).await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockBehavior, MockStompTransport, TransportError};

    fn config() -> StompConfig {
        StompConfig {
            host: "ltnm.example.com".to_string(),
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            username: "some_username".to_string(),
            password: "some_password_123".to_string(),
        }
    }

    fn client_with(behavior: MockBehavior) -> StompClient {
        StompClient::new(config(), Box::new(MockStompTransport::new(behavior)))
    }

    #[tokio::test]
    async fn test_connect_with_valid_credentials_emits_connected() {
        // Arrange
        let client = client_with(MockBehavior::default());

        // Act
        let (handle, mut events) = client.connect(credentials());

        // Assert
        assert_eq!(events.recv().await, Some(StompEvent::Connected));
        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_failure_emits_connection_failed() {
        let behavior = MockBehavior {
            connect_error: Some(TransportError::Connect("stream truncated".to_string())),
            ..MockBehavior::default()
        };
        let (_handle, mut events) = client_with(behavior).connect(credentials());

        assert_eq!(
            events.recv().await,
            Some(StompEvent::ConnectionFailed(
                StompClientError::CouldNotConnectToWebSocketsServer
            ))
        );
        // The task is gone; the channel closes without further events.
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_send_failure_emits_could_not_send_stomp_frame() {
        let behavior = MockBehavior {
            send_error: Some(TransportError::Send("broken pipe".to_string())),
            ..MockBehavior::default()
        };
        let (_handle, mut events) = client_with(behavior).connect(credentials());

        assert_eq!(
            events.recv().await,
            Some(StompEvent::ConnectionFailed(
                StompClientError::CouldNotSendStompFrame
            ))
        );
    }

    #[tokio::test]
    async fn test_auth_failure_emits_disconnected_not_connection_failed() {
        // Arrange: the mock rejects this password with ERROR + disconnection
        let client = client_with(MockBehavior::default());
        let bad_credentials = Credentials {
            username: "some_username".to_string(),
            password: "wrong_password_123".to_string(),
        };

        // Act
        let (_handle, mut events) = client.connect(bad_credentials);

        // Assert: the connect notification never fires; the disconnect does
        assert_eq!(
            events.recv().await,
            Some(StompEvent::Disconnected {
                error: Some(StompClientError::WebSocketsServerDisconnected)
            })
        );
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_subscribe_returns_id_and_emits_subscribed_before_messages() {
        // Arrange
        let behavior = MockBehavior {
            subscription_messages: vec!["body-1".to_string()],
            ..MockBehavior::default()
        };
        let (handle, mut events) = client_with(behavior).connect(credentials());
        assert_eq!(events.recv().await, Some(StompEvent::Connected));

        // Act
        let id = handle.subscribe("/passengers").await.expect("non-empty id");
        assert!(!id.is_empty());

        // Assert: Subscribed first, carrying the same id, then the message
        assert_eq!(events.recv().await, Some(StompEvent::Subscribed(id.clone())));
        assert_eq!(
            events.recv().await,
            Some(StompEvent::Message {
                subscription: id,
                body: "body-1".to_string(),
            })
        );
        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_two_subscriptions_get_unique_ids() {
        let (handle, mut events) = client_with(MockBehavior::default()).connect(credentials());
        assert_eq!(events.recv().await, Some(StompEvent::Connected));

        let first = handle.subscribe("/passengers").await.unwrap();
        let second = handle.subscribe("/passengers").await.unwrap();
        assert_ne!(first, second);
        handle.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_subscription_ends_in_disconnect() {
        // Arrange: the mock only accepts /not-passengers
        let behavior = MockBehavior {
            endpoint: "/not-passengers".to_string(),
            ..MockBehavior::default()
        };
        let (handle, mut events) = client_with(behavior).connect(credentials());
        assert_eq!(events.recv().await, Some(StompEvent::Connected));

        // Act: the frame still reaches the wire, so the id is non-empty
        let id = handle.subscribe("/passengers").await;
        assert!(id.is_some());

        // Assert: the server answers ERROR (logged, connection kept) and
        // then drops the connection
        assert_eq!(
            events.recv().await,
            Some(StompEvent::Disconnected {
                error: Some(StompClientError::WebSocketsServerDisconnected)
            })
        );
    }

    #[tokio::test]
    async fn test_close_reports_ok_and_ends_the_event_stream() {
        let (handle, mut events) = client_with(MockBehavior::default()).connect(credentials());
        assert_eq!(events.recv().await, Some(StompEvent::Connected));

        assert!(handle.close().await.is_ok());
        // Invariant: after a successful close, no further events.
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_failure_is_reported() {
        let behavior = MockBehavior {
            close_error: Some(TransportError::Close("already closed".to_string())),
            ..MockBehavior::default()
        };
        let (handle, mut events) = client_with(behavior).connect(credentials());
        assert_eq!(events.recv().await, Some(StompEvent::Connected));

        assert_eq!(
            handle.close().await,
            Err(StompClientError::CouldNotCloseWebSocketsConnection)
        );
    }

    #[tokio::test]
    async fn test_close_after_task_exit_reports_close_error() {
        // Arrange: connect fails, so the task exits immediately
        let behavior = MockBehavior {
            connect_error: Some(TransportError::Connect("refused".to_string())),
            ..MockBehavior::default()
        };
        let (handle, mut events) = client_with(behavior).connect(credentials());
        assert!(matches!(
            events.recv().await,
            Some(StompEvent::ConnectionFailed(_))
        ));
        assert_eq!(events.recv().await, None);

        // Act / Assert: closing a connection that never came up
        assert_eq!(
            handle.close().await,
            Err(StompClientError::CouldNotCloseWebSocketsConnection)
        );
    }

    #[tokio::test]
    async fn test_scripted_disconnection_emits_disconnected_once() {
        let behavior = MockBehavior {
            trigger_disconnection: true,
            ..MockBehavior::default()
        };
        let (_handle, mut events) = client_with(behavior).connect(credentials());

        // The disconnection races the CONNECTED reply; collect everything
        // the task emits and check the disconnect arrived exactly once,
        // with nothing after it.
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            seen.push(event);
        }
        let disconnects = seen
            .iter()
            .filter(|e| matches!(e, StompEvent::Disconnected { .. }))
            .count();
        assert_eq!(disconnects, 1, "Disconnected must be delivered exactly once");
        assert!(
            matches!(seen.last(), Some(StompEvent::Disconnected { .. })),
            "no event may follow Disconnected"
        );
    }
}
