//! Secure WebSocket transport backed by tokio-tungstenite.
//!
//! The transport dials `wss://{url}:{port}{endpoint}` with a rustls
//! connector anchored to the configured CA certificate. WebSocket
//! protocol-level ping/pong is handled by tungstenite; this layer only
//! surfaces text frames and the disconnect cause.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async_tls_with_config,
    tungstenite::{Error as WsError, Message as WsMessage},
    Connector, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};

use crate::transport::{tls, StompTransport, TransportError, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A [`StompTransport`] over TLS WebSockets.
///
/// Construction is cheap and does no I/O; the TLS configuration is built
/// and the connection dialed in [`StompTransport::connect`].
pub struct WebSocketTransport {
    url: String,
    port: u16,
    endpoint: String,
    ca_cert_file: PathBuf,
    stream: Option<WsStream>,
}

impl WebSocketTransport {
    /// Creates a transport for `wss://{url}:{port}{endpoint}`, trusting the
    /// CA certificate at `ca_cert_file`.
    pub fn new(
        url: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
        ca_cert_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            port,
            endpoint: endpoint.into(),
            ca_cert_file: ca_cert_file.into(),
            stream: None,
        }
    }

    /// The request URL this transport dials.
    pub fn request_url(&self) -> String {
        format!("wss://{}:{}{}", self.url, self.port, self.endpoint)
    }
}

#[async_trait]
impl StompTransport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let tls_config = tls::client_tls_config(&self.ca_cert_file)?;
        let request = self.request_url();
        debug!("connecting to {request}");

        let connector = Connector::Rustls(Arc::new(tls_config));
        let (stream, response) =
            connect_async_tls_with_config(request.as_str(), None, false, Some(connector))
                .await
                .map_err(|e| TransportError::Connect(e.to_string()))?;

        debug!("WebSocket handshake complete: {:?}", response.status());
        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream
            .send(WsMessage::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream
            .close(None)
            .await
            .map_err(|e| TransportError::Close(e.to_string()))
    }

    async fn next_event(&mut self) -> TransportEvent {
        loop {
            let item = match self.stream.as_mut() {
                Some(stream) => stream.next().await,
                None => {
                    return TransportEvent::Disconnected {
                        clean: true,
                        reason: "the transport is not connected".to_string(),
                    }
                }
            };

            match item {
                Some(Ok(WsMessage::Text(text))) => return TransportEvent::Message(text),
                Some(Ok(WsMessage::Binary(_))) => {
                    // The event service speaks text-only STOMP.
                    warn!("ignoring unexpected binary WebSocket frame");
                }
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Ok(WsMessage::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "close frame".to_string());
                    debug!("WebSocket closed by peer: {reason}");
                    self.stream = None;
                    return TransportEvent::Disconnected {
                        clean: true,
                        reason,
                    };
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    self.stream = None;
                    return TransportEvent::Disconnected {
                        clean: true,
                        reason: "connection closed".to_string(),
                    };
                }
                Some(Err(e)) => {
                    self.stream = None;
                    return TransportEvent::Disconnected {
                        clean: false,
                        reason: e.to_string(),
                    };
                }
                None => {
                    self.stream = None;
                    return TransportEvent::Disconnected {
                        clean: true,
                        reason: "WebSocket stream ended".to_string(),
                    };
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
