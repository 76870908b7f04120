//! STOMP frame types: commands, header names, and the [`Frame`] struct.
//!
//! Frames are validated at construction time against the per-command
//! required-header policy, so the transport never sees a malformed frame.

use crate::stomp::codec::FrameError;

/// The closed set of STOMP 1.2 commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StompCommand {
    /// Client connection request (STOMP 1.2 spelling).
    Stomp,
    /// Client connection request (legacy spelling, still valid in 1.2).
    Connect,
    /// Server acknowledgment of a connection request.
    Connected,
    /// Client request to receive messages from a destination.
    Subscribe,
    /// Client request to stop receiving messages from a destination.
    Unsubscribe,
    /// Client message to a destination.
    Send,
    /// Server delivery of a message to a subscription.
    Message,
    /// Server confirmation of a client frame, correlated by `receipt-id`.
    Receipt,
    /// Server error notification; the body carries the reason.
    Error,
    /// Client request to close the session.
    Disconnect,
    /// Client acknowledgment of a message.
    Ack,
    /// Client negative acknowledgment of a message.
    Nack,
    /// Transaction begin.
    Begin,
    /// Transaction commit.
    Commit,
    /// Transaction abort.
    Abort,
}

impl StompCommand {
    /// Returns the wire spelling of the command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stomp => "STOMP",
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Send => "SEND",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
            Self::Disconnect => "DISCONNECT",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
        }
    }

    /// Parses a command from its wire spelling.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownCommand`] for anything outside the
    /// closed set. Commands are case sensitive on the wire.
    pub fn from_wire(s: &str) -> Result<Self, FrameError> {
        match s {
            "STOMP" => Ok(Self::Stomp),
            "CONNECT" => Ok(Self::Connect),
            "CONNECTED" => Ok(Self::Connected),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "SEND" => Ok(Self::Send),
            "MESSAGE" => Ok(Self::Message),
            "RECEIPT" => Ok(Self::Receipt),
            "ERROR" => Ok(Self::Error),
            "DISCONNECT" => Ok(Self::Disconnect),
            "ACK" => Ok(Self::Ack),
            "NACK" => Ok(Self::Nack),
            "BEGIN" => Ok(Self::Begin),
            "COMMIT" => Ok(Self::Commit),
            "ABORT" => Ok(Self::Abort),
            other => Err(FrameError::UnknownCommand(other.to_string())),
        }
    }
}

impl std::fmt::Display for StompCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// STOMP header names.
///
/// The fifteen names this system knows about get their own variants;
/// anything else is carried verbatim in [`HeaderName::Other`] so unknown
/// headers are permitted and preserved across a parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HeaderName {
    AcceptVersion,
    Host,
    Login,
    Passcode,
    Destination,
    Id,
    Ack,
    Receipt,
    ReceiptId,
    Subscription,
    MessageId,
    ContentLength,
    ContentType,
    Version,
    HeartBeat,
    /// A header name outside the known set, preserved verbatim.
    Other(String),
}

impl HeaderName {
    /// Returns the wire spelling of the header name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::AcceptVersion => "accept-version",
            Self::Host => "host",
            Self::Login => "login",
            Self::Passcode => "passcode",
            Self::Destination => "destination",
            Self::Id => "id",
            Self::Ack => "ack",
            Self::Receipt => "receipt",
            Self::ReceiptId => "receipt-id",
            Self::Subscription => "subscription",
            Self::MessageId => "message-id",
            Self::ContentLength => "content-length",
            Self::ContentType => "content-type",
            Self::Version => "version",
            Self::HeartBeat => "heart-beat",
            Self::Other(name) => name,
        }
    }

    /// Maps a wire name to a known variant, or preserves it as `Other`.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "accept-version" => Self::AcceptVersion,
            "host" => Self::Host,
            "login" => Self::Login,
            "passcode" => Self::Passcode,
            "destination" => Self::Destination,
            "id" => Self::Id,
            "ack" => Self::Ack,
            "receipt" => Self::Receipt,
            "receipt-id" => Self::ReceiptId,
            "subscription" => Self::Subscription,
            "message-id" => Self::MessageId,
            "content-length" => Self::ContentLength,
            "content-type" => Self::ContentType,
            "version" => Self::Version,
            "heart-beat" => Self::HeartBeat,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for HeaderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the headers a command must carry before it may be serialized.
///
/// Commands not listed here have no required headers.
fn required_headers(command: StompCommand) -> &'static [HeaderName] {
    match command {
        StompCommand::Stomp | StompCommand::Connect => &[
            HeaderName::AcceptVersion,
            HeaderName::Host,
            HeaderName::Login,
            HeaderName::Passcode,
        ],
        StompCommand::Subscribe => &[
            HeaderName::Destination,
            HeaderName::Id,
            HeaderName::Ack,
        ],
        StompCommand::Connected => &[HeaderName::Version],
        StompCommand::Message => &[
            HeaderName::Subscription,
            HeaderName::MessageId,
            HeaderName::Destination,
        ],
        StompCommand::Receipt => &[HeaderName::ReceiptId],
        _ => &[],
    }
}

/// One STOMP frame: command, ordered headers, body.
///
/// Header order is preserved exactly as constructed (and, after a parse,
/// exactly as received). Duplicate header names are allowed; [`Frame::header`]
/// returns the first occurrence, as STOMP 1.2 requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: StompCommand,
    headers: Vec<(HeaderName, String)>,
    body: String,
}

impl Frame {
    /// Builds a frame, validating the required-header policy for `command`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::MissingRequiredHeader`] if a header the command
    /// requires is absent. The check happens here, at construction time, so
    /// nothing malformed can be handed to the transport.
    pub fn new(
        command: StompCommand,
        headers: Vec<(HeaderName, String)>,
        body: impl Into<String>,
    ) -> Result<Self, FrameError> {
        for required in required_headers(command) {
            if !headers.iter().any(|(name, _)| name == required) {
                return Err(FrameError::MissingRequiredHeader {
                    command,
                    header: required.clone(),
                });
            }
        }
        Ok(Self {
            command,
            headers,
            body: body.into(),
        })
    }

    /// Builds a frame without the required-header check.
    ///
    /// Only the parser uses this: frames arriving off the wire are reported
    /// as received, even when a peer omitted a required header.
    pub(crate) fn from_parts(
        command: StompCommand,
        headers: Vec<(HeaderName, String)>,
        body: String,
    ) -> Self {
        Self {
            command,
            headers,
            body,
        }
    }

    /// The connection frame this client sends: `STOMP` with the canonical
    /// header order `accept-version`, `host`, `login`, `passcode`.
    pub fn stomp_connect(host: &str, login: &str, passcode: &str) -> Result<Self, FrameError> {
        Self::new(
            StompCommand::Stomp,
            vec![
                (HeaderName::AcceptVersion, "1.2".to_string()),
                (HeaderName::Host, host.to_string()),
                (HeaderName::Login, login.to_string()),
                (HeaderName::Passcode, passcode.to_string()),
            ],
            "",
        )
    }

    /// The subscription frame this client sends: `SUBSCRIBE` with the
    /// canonical header order `id`, `destination`, `ack`, `receipt`.
    ///
    /// The `receipt` value equals the subscription id, so the server's
    /// RECEIPT can be correlated straight back to the registry entry.
    pub fn subscribe(id: &str, destination: &str) -> Result<Self, FrameError> {
        Self::new(
            StompCommand::Subscribe,
            vec![
                (HeaderName::Id, id.to_string()),
                (HeaderName::Destination, destination.to_string()),
                (HeaderName::Ack, "auto".to_string()),
                (HeaderName::Receipt, id.to_string()),
            ],
            "",
        )
    }

    /// A server `CONNECTED` frame. Used by the mock transport and tests.
    pub fn connected(version: &str) -> Result<Self, FrameError> {
        Self::new(
            StompCommand::Connected,
            vec![(HeaderName::Version, version.to_string())],
            "",
        )
    }

    /// A server `RECEIPT` frame. Used by the mock transport and tests.
    pub fn receipt(receipt_id: &str) -> Result<Self, FrameError> {
        Self::new(
            StompCommand::Receipt,
            vec![(HeaderName::ReceiptId, receipt_id.to_string())],
            "",
        )
    }

    /// A server `MESSAGE` frame carrying a JSON body. Used by the mock
    /// transport and tests.
    pub fn message(
        subscription: &str,
        message_id: &str,
        destination: &str,
        body: &str,
    ) -> Result<Self, FrameError> {
        Self::new(
            StompCommand::Message,
            vec![
                (HeaderName::Subscription, subscription.to_string()),
                (HeaderName::MessageId, message_id.to_string()),
                (HeaderName::Destination, destination.to_string()),
                (HeaderName::ContentType, "application/json".to_string()),
                (HeaderName::ContentLength, body.len().to_string()),
            ],
            body,
        )
    }

    /// A server `ERROR` frame; the body carries the reason.
    pub fn error(reason: &str) -> Result<Self, FrameError> {
        Self::new(StompCommand::Error, Vec::new(), reason)
    }

    /// The frame command.
    pub fn command(&self) -> StompCommand {
        self.command
    }

    /// The value of the first header named `name`, if any.
    ///
    /// Duplicate header names are legal on the wire; STOMP 1.2 gives the
    /// first occurrence precedence, and so does this accessor.
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }

    /// All headers in order, duplicates included.
    pub fn headers(&self) -> &[(HeaderName, String)] {
        &self.headers
    }

    /// The frame body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Serializes the frame to its wire form. See [`crate::stomp::codec::serialize`].
    pub fn to_wire(&self) -> String {
        crate::stomp::codec::serialize(self)
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command)?;
        for (name, value) in &self.headers {
            write!(f, " {name}:{value}")?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
