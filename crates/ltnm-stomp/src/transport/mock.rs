//! Scriptable in-memory transport for tests.
//!
//! `MockStompTransport` plays the server side of the protocol well enough
//! to drive every client path:
//!
//! - A STOMP/CONNECT frame with the expected credentials is answered with
//!   CONNECTED; wrong credentials get ERROR followed by a disconnection,
//!   which is what the real event service does.
//! - A SUBSCRIBE frame for the expected endpoint is answered with a
//!   RECEIPT and then one MESSAGE per scripted body; any other endpoint
//!   gets ERROR followed by a disconnection.
//!
//! Failures at the transport layer (connect, send, close) are scripted
//! through [`MockBehavior`], mirroring the error-code knobs of the Boost
//! stream mocks this design descends from.

use std::collections::VecDeque;

use async_trait::async_trait;
use tracing::debug;

use ltnm_core::{Frame, HeaderName, StompCommand};

use crate::transport::{StompTransport, TransportError, TransportEvent};

/// Scripted behavior for the mock transport.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// Error returned by `connect`, if any.
    pub connect_error: Option<TransportError>,
    /// Error returned by every `send`, if any.
    pub send_error: Option<TransportError>,
    /// Error returned by `close`, if any.
    pub close_error: Option<TransportError>,
    /// The username the mock server accepts.
    pub username: String,
    /// The password the mock server accepts.
    pub password: String,
    /// The only destination the mock server accepts subscriptions for.
    pub endpoint: String,
    /// Bodies delivered as MESSAGE frames once a subscription succeeds.
    pub subscription_messages: Vec<String>,
    /// Drop the connection right after it is established.
    pub trigger_disconnection: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            connect_error: None,
            send_error: None,
            close_error: None,
            username: "some_username".to_string(),
            password: "some_password_123".to_string(),
            endpoint: "/passengers".to_string(),
            subscription_messages: Vec::new(),
            trigger_disconnection: false,
        }
    }
}

/// An in-memory [`StompTransport`] driven by a [`MockBehavior`] script.
pub struct MockStompTransport {
    behavior: MockBehavior,
    connected: bool,
    /// Events queued for `next_event`. `None` marks the back of the queue
    /// as permanently blocked (mirrors a live connection with nothing to
    /// say); a `Disconnected` entry ends the conversation.
    queue: VecDeque<TransportEvent>,
    /// Wakes a pending `next_event` when the queue gains entries.
    notify: tokio::sync::Notify,
    /// Set once a `Disconnected` event has been delivered; replayed on
    /// every later `next_event` call, like a real dead connection.
    disconnected: Option<TransportEvent>,
    message_seq: u64,
}

impl MockStompTransport {
    /// Creates a mock transport with the given script.
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            connected: false,
            queue: VecDeque::new(),
            notify: tokio::sync::Notify::new(),
            disconnected: None,
            message_seq: 0,
        }
    }

    fn push(&mut self, event: TransportEvent) {
        self.queue.push_back(event);
        self.notify.notify_one();
    }

    fn push_frame(&mut self, frame: Frame) {
        self.push(TransportEvent::Message(frame.to_wire()));
    }

    fn push_error_and_disconnect(&mut self, reason: &str) {
        // A frame that fails validation here is a bug in the test script,
        // not in the client under test.
        let error = Frame::error(reason).expect("ERROR frame has no required headers");
        self.push_frame(error);
        self.push(TransportEvent::Disconnected {
            clean: false,
            reason: reason.to_string(),
        });
    }

    fn handle_connect_frame(&mut self, frame: &Frame) {
        let login = frame.header(&HeaderName::Login);
        let passcode = frame.header(&HeaderName::Passcode);
        if login == Some(self.behavior.username.as_str())
            && passcode == Some(self.behavior.password.as_str())
        {
            debug!("mock server: credentials accepted");
            let connected = Frame::connected("1.2").expect("CONNECTED frame is valid");
            self.push_frame(connected);
        } else {
            debug!("mock server: credentials rejected");
            self.push_error_and_disconnect("Authentication failed");
        }
    }

    fn handle_subscribe_frame(&mut self, frame: &Frame) {
        let destination = frame.header(&HeaderName::Destination).unwrap_or_default();
        let id = frame.header(&HeaderName::Id).unwrap_or_default().to_string();
        let receipt = frame.header(&HeaderName::Receipt).map(str::to_string);

        if destination != self.behavior.endpoint || id.is_empty() {
            debug!("mock server: subscription to {destination:?} rejected");
            self.push_error_and_disconnect("Subscription rejected");
            return;
        }

        if let Some(receipt_id) = receipt {
            let receipt = Frame::receipt(&receipt_id).expect("RECEIPT frame is valid");
            self.push_frame(receipt);
        }

        let destination = destination.to_string();
        for body in self.behavior.subscription_messages.clone() {
            self.message_seq += 1;
            let message_id = format!("msg-{}", self.message_seq);
            let message = Frame::message(&id, &message_id, &destination, &body)
                .expect("MESSAGE frame is valid");
            self.push_frame(message);
        }
    }
}

#[async_trait]
impl StompTransport for MockStompTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if let Some(error) = self.behavior.connect_error.clone() {
            return Err(error);
        }
        self.connected = true;
        if self.behavior.trigger_disconnection {
            self.push(TransportEvent::Disconnected {
                clean: false,
                reason: "scripted disconnection".to_string(),
            });
        }
        Ok(())
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if let Some(error) = self.behavior.send_error.clone() {
            return Err(error);
        }
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let frame = match ltnm_core::parse(&text) {
            Ok(frame) => frame,
            Err(e) => {
                // The client promises never to emit an invalid frame.
                self.push_error_and_disconnect(&format!("unparseable client frame: {e}"));
                return Ok(());
            }
        };

        match frame.command() {
            StompCommand::Stomp | StompCommand::Connect => self.handle_connect_frame(&frame),
            StompCommand::Subscribe => self.handle_subscribe_frame(&frame),
            other => debug!("mock server: ignoring {other} frame"),
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(error) = self.behavior.close_error.clone() {
            return Err(error);
        }
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.connected = false;
        Ok(())
    }

    async fn next_event(&mut self) -> TransportEvent {
        loop {
            if let Some(event) = self.queue.pop_front() {
                if matches!(event, TransportEvent::Disconnected { .. }) {
                    self.disconnected = Some(event.clone());
                }
                return event;
            }
            if let Some(event) = &self.disconnected {
                return event.clone();
            }
            // Nothing queued: behave like a live connection with no
            // traffic and wait until a send produces server frames.
            self.notify.notified().await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect_and_authenticate(mock: &mut MockStompTransport) {
        mock.connect().await.unwrap();
        let frame = Frame::stomp_connect("host", "some_username", "some_password_123").unwrap();
        mock.send(frame.to_wire()).await.unwrap();
        let event = mock.next_event().await;
        let TransportEvent::Message(text) = event else {
            panic!("expected a CONNECTED frame, got {event:?}");
        };
        let connected = ltnm_core::parse(&text).unwrap();
        assert_eq!(connected.command(), StompCommand::Connected);
    }

    #[tokio::test]
    async fn test_valid_credentials_get_connected_frame() {
        let mut mock = MockStompTransport::new(MockBehavior::default());
        connect_and_authenticate(&mut mock).await;
    }

    #[tokio::test]
    async fn test_wrong_credentials_get_error_then_disconnect() {
        // Arrange
        let mut mock = MockStompTransport::new(MockBehavior::default());
        mock.connect().await.unwrap();

        // Act: authenticate with the wrong password
        let frame = Frame::stomp_connect("host", "some_username", "wrong_password_123").unwrap();
        mock.send(frame.to_wire()).await.unwrap();

        // Assert: ERROR frame first, then a dirty disconnection
        let TransportEvent::Message(text) = mock.next_event().await else {
            panic!("expected an ERROR frame");
        };
        assert_eq!(ltnm_core::parse(&text).unwrap().command(), StompCommand::Error);
        assert!(matches!(
            mock.next_event().await,
            TransportEvent::Disconnected { clean: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_subscribe_to_expected_endpoint_gets_receipt_then_messages() {
        // Arrange
        let behavior = MockBehavior {
            subscription_messages: vec!["body-1".to_string(), "body-2".to_string()],
            ..MockBehavior::default()
        };
        let mut mock = MockStompTransport::new(behavior);
        connect_and_authenticate(&mut mock).await;

        // Act
        let subscribe = Frame::subscribe("sub-1", "/passengers").unwrap();
        mock.send(subscribe.to_wire()).await.unwrap();

        // Assert: RECEIPT correlated to the subscription, then both bodies
        let TransportEvent::Message(text) = mock.next_event().await else {
            panic!("expected a RECEIPT frame");
        };
        let receipt = ltnm_core::parse(&text).unwrap();
        assert_eq!(receipt.command(), StompCommand::Receipt);
        assert_eq!(receipt.header(&HeaderName::ReceiptId), Some("sub-1"));

        for expected in ["body-1", "body-2"] {
            let TransportEvent::Message(text) = mock.next_event().await else {
                panic!("expected a MESSAGE frame");
            };
            let message = ltnm_core::parse(&text).unwrap();
            assert_eq!(message.command(), StompCommand::Message);
            assert_eq!(message.header(&HeaderName::Subscription), Some("sub-1"));
            assert_eq!(message.body(), expected);
        }
    }

    #[tokio::test]
    async fn test_subscribe_to_unexpected_endpoint_gets_error_then_disconnect() {
        let behavior = MockBehavior {
            endpoint: "/not-passengers".to_string(),
            ..MockBehavior::default()
        };
        let mut mock = MockStompTransport::new(behavior);
        connect_and_authenticate(&mut mock).await;

        let subscribe = Frame::subscribe("sub-1", "/passengers").unwrap();
        mock.send(subscribe.to_wire()).await.unwrap();

        let TransportEvent::Message(text) = mock.next_event().await else {
            panic!("expected an ERROR frame");
        };
        assert_eq!(ltnm_core::parse(&text).unwrap().command(), StompCommand::Error);
        assert!(matches!(
            mock.next_event().await,
            TransportEvent::Disconnected { clean: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_scripted_connect_error_is_returned() {
        let behavior = MockBehavior {
            connect_error: Some(TransportError::Connect("stream truncated".to_string())),
            ..MockBehavior::default()
        };
        let mut mock = MockStompTransport::new(behavior);
        assert!(matches!(
            mock.connect().await,
            Err(TransportError::Connect(_))
        ));
    }

    #[tokio::test]
    async fn test_scripted_send_error_is_returned() {
        let behavior = MockBehavior {
            send_error: Some(TransportError::Send("broken pipe".to_string())),
            ..MockBehavior::default()
        };
        let mut mock = MockStompTransport::new(behavior);
        mock.connect().await.unwrap();
        let frame = Frame::stomp_connect("host", "u", "p").unwrap();
        assert!(matches!(
            mock.send(frame.to_wire()).await,
            Err(TransportError::Send(_))
        ));
    }

    #[tokio::test]
    async fn test_trigger_disconnection_queues_a_dirty_disconnect() {
        let behavior = MockBehavior {
            trigger_disconnection: true,
            ..MockBehavior::default()
        };
        let mut mock = MockStompTransport::new(behavior);
        mock.connect().await.unwrap();
        assert!(matches!(
            mock.next_event().await,
            TransportEvent::Disconnected { clean: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_close_before_connect_reports_not_connected() {
        let mut mock = MockStompTransport::new(MockBehavior::default());
        assert_eq!(mock.close().await, Err(TransportError::NotConnected));
    }
}
