//! Wire codec for STOMP 1.2 frames.
//!
//! Wire format:
//! ```text
//! COMMAND\n
//! name:value\n        (zero or more, values escaped)
//! \n
//! body\0
//! ```
//!
//! Serialization writes headers in construction order; the frame
//! constructors in [`crate::stomp::frame`] place required headers in their
//! canonical order, which is how the emit side normalizes header order.
//! Parsing preserves wire order instead, so `parse ∘ serialize` is not the
//! identity in general. `serialize ∘ parse` is, for every frame this
//! system emits.

use crate::stomp::frame::{Frame, HeaderName, StompCommand};
use thiserror::Error;

/// Errors produced by frame parsing and construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The command line names a command outside the closed set.
    #[error("unknown STOMP command: {0:?}")]
    UnknownCommand(String),

    /// A header line is malformed: missing colon, control character in the
    /// name, or content where the frame should have ended.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// A header value contains an escape sequence outside `\n \r \c \\`.
    #[error("disallowed escape sequence in header value: {0:?}")]
    BadEscape(String),

    /// The body length does not match the `content-length` header.
    #[error("content-length mismatch: declared {declared}, found {found}")]
    LengthMismatch { declared: usize, found: usize },

    /// The frame is not terminated by a NUL octet.
    #[error("frame is missing the terminating NUL octet")]
    MissingNull,

    /// A frame was constructed without a header its command requires.
    #[error("{command} frame is missing required header {header}")]
    MissingRequiredHeader {
        command: StompCommand,
        header: HeaderName,
    },
}

/// Escapes a header value per STOMP 1.2: `\` `\r` `\n` `:` become
/// `\\` `\r` `\n` `\c`.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str(r"\\"),
            '\r' => out.push_str(r"\r"),
            '\n' => out.push_str(r"\n"),
            ':' => out.push_str(r"\c"),
            other => out.push(other),
        }
    }
    out
}

/// Reverses [`escape`].
///
/// # Errors
///
/// Returns [`FrameError::BadEscape`] for any `\x` sequence outside the four
/// allowed ones, including a trailing lone backslash.
fn unescape(value: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some(other) => return Err(FrameError::BadEscape(format!("\\{other}"))),
            None => return Err(FrameError::BadEscape("\\".to_string())),
        }
    }
    Ok(out)
}

/// Serializes a frame to its canonical wire form, NUL terminator included.
pub fn serialize(frame: &Frame) -> String {
    let mut out = String::new();
    out.push_str(frame.command().as_str());
    out.push('\n');
    for (name, value) in frame.headers() {
        out.push_str(name.as_str());
        out.push(':');
        out.push_str(&escape(value));
        out.push('\n');
    }
    out.push('\n');
    out.push_str(frame.body());
    out.push('\0');
    out
}

/// Parses one STOMP frame from `input`.
///
/// The frame must be NUL terminated; trailing whitespace after the NUL is
/// ignored (servers use it for heart-beating). Wire header order and
/// duplicates are preserved.
///
/// # Errors
///
/// See [`FrameError`] for the rejection cases.
pub fn parse(input: &str) -> Result<Frame, FrameError> {
    let bytes = input.as_bytes();

    // Command line.
    let command_end = input.find('\n').ok_or(FrameError::MissingNull)?;
    let command_line = input[..command_end].trim_end_matches('\r');
    let command = StompCommand::from_wire(command_line)?;

    // Header block: lines up to the first empty line.
    let mut headers = Vec::new();
    let mut cursor = command_end + 1;
    loop {
        let line_end = input[cursor..]
            .find('\n')
            .map(|off| cursor + off)
            .ok_or(FrameError::MissingNull)?;
        let line = input[cursor..line_end].trim_end_matches('\r');
        cursor = line_end + 1;
        if line.is_empty() {
            break;
        }

        let colon = line.find(':').ok_or_else(|| {
            FrameError::MalformedHeader(format!("missing colon in header line {line:?}"))
        })?;
        let (raw_name, raw_value) = (&line[..colon], &line[colon + 1..]);
        if raw_name.is_empty() {
            return Err(FrameError::MalformedHeader("empty header name".to_string()));
        }
        if raw_name.chars().any(|c| c.is_control()) {
            return Err(FrameError::MalformedHeader(format!(
                "control character in header name {raw_name:?}"
            )));
        }
        headers.push((HeaderName::from_wire(raw_name), unescape(raw_value)?));
    }

    // Body: bounded by content-length when present, by the NUL otherwise.
    let declared_length = headers
        .iter()
        .find(|(name, _)| *name == HeaderName::ContentLength)
        .map(|(_, value)| {
            value.parse::<usize>().map_err(|_| {
                FrameError::MalformedHeader(format!("invalid content-length value {value:?}"))
            })
        })
        .transpose()?;

    let (body, nul_pos) = match declared_length {
        Some(declared) => {
            let body_end = cursor + declared;
            if body_end >= bytes.len() || bytes[body_end] != 0 {
                return Err(FrameError::LengthMismatch {
                    declared,
                    found: input[cursor..]
                        .find('\0')
                        .unwrap_or(bytes.len() - cursor),
                });
            }
            // `body_end` sits on a NUL, so both slice bounds are valid
            // UTF-8 boundaries.
            (input[cursor..body_end].to_string(), body_end)
        }
        None => {
            let nul = input[cursor..]
                .find('\0')
                .map(|off| cursor + off)
                .ok_or(FrameError::MissingNull)?;
            (input[cursor..nul].to_string(), nul)
        }
    };

    // Anything after the NUL must be whitespace.
    let trailing = &input[nul_pos + 1..];
    if !trailing.chars().all(char::is_whitespace) {
        return Err(FrameError::MalformedHeader(format!(
            "unexpected content after frame terminator: {trailing:?}"
        )));
    }

    Ok(Frame::from_parts(command, headers, body))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_stomp_connect_matches_wire_format() {
        // Arrange
        let frame =
            Frame::stomp_connect("ltnm.example.com", "some_username", "some_password_123").unwrap();

        // Act
        let wire = serialize(&frame);

        // Assert – the exact byte layout the server expects
        assert_eq!(
            wire,
            "STOMP\n\
             accept-version:1.2\n\
             host:ltnm.example.com\n\
             login:some_username\n\
             passcode:some_password_123\n\
             \n\
             \0"
        );
    }

    #[test]
    fn test_serialize_subscribe_matches_wire_format() {
        let frame = Frame::subscribe("sub-1", "/passengers").unwrap();
        assert_eq!(
            serialize(&frame),
            "SUBSCRIBE\n\
             id:sub-1\n\
             destination:/passengers\n\
             ack:auto\n\
             receipt:sub-1\n\
             \n\
             \0"
        );
    }

    #[test]
    fn test_serialize_then_parse_is_identity_for_emitted_frames() {
        let frames = vec![
            Frame::stomp_connect("host", "user", "pass").unwrap(),
            Frame::subscribe("sub-9", "/passengers").unwrap(),
            Frame::connected("1.2").unwrap(),
            Frame::receipt("sub-9").unwrap(),
            Frame::message("sub-9", "msg-1", "/passengers", r#"{"a":1}"#).unwrap(),
            Frame::error("something went wrong").unwrap(),
        ];
        for frame in frames {
            let parsed = parse(&serialize(&frame)).unwrap();
            assert_eq!(parsed, frame);
        }
    }

    #[test]
    fn test_parse_preserves_wire_header_order_and_duplicates() {
        // Arrange: duplicate destination, custom order
        let wire = "MESSAGE\n\
                    destination:/passengers\n\
                    subscription:sub-1\n\
                    message-id:m-1\n\
                    destination:/other\n\
                    \n\
                    body\0";

        // Act
        let frame = parse(wire).unwrap();

        // Assert – order preserved, first occurrence wins on access
        assert_eq!(frame.headers().len(), 4);
        assert_eq!(frame.header(&HeaderName::Destination), Some("/passengers"));
    }

    #[test]
    fn test_parse_unknown_command_is_rejected() {
        let result = parse("FETCH\n\n\0");
        assert!(matches!(result, Err(FrameError::UnknownCommand(_))));
    }

    #[test]
    fn test_parse_missing_null_is_rejected() {
        let result = parse("RECEIPT\nreceipt-id:r-1\n\nbody");
        assert_eq!(result, Err(FrameError::MissingNull));
    }

    #[test]
    fn test_parse_header_without_colon_is_rejected() {
        let result = parse("RECEIPT\nreceipt-id r-1\n\n\0");
        assert!(matches!(result, Err(FrameError::MalformedHeader(_))));
    }

    #[test]
    fn test_parse_control_character_in_header_name_is_rejected() {
        let result = parse("RECEIPT\nreceipt\u{7}id:r-1\n\n\0");
        assert!(matches!(result, Err(FrameError::MalformedHeader(_))));
    }

    #[test]
    fn test_parse_bad_escape_is_rejected() {
        let result = parse("RECEIPT\nreceipt-id:r\\t1\n\n\0");
        assert_eq!(result, Err(FrameError::BadEscape("\\t".to_string())));
    }

    #[test]
    fn test_parse_trailing_lone_backslash_is_rejected() {
        let result = parse("RECEIPT\nreceipt-id:r1\\\n\n\0");
        assert_eq!(result, Err(FrameError::BadEscape("\\".to_string())));
    }

    #[test]
    fn test_escape_round_trip_for_special_characters() {
        let original = "line1\nline2:colon\\backslash\rcr";
        let unescaped = unescape(&escape(original)).unwrap();
        assert_eq!(unescaped, original);
    }

    #[test]
    fn test_escaped_value_survives_frame_round_trip() {
        let frame = Frame::new(
            StompCommand::Receipt,
            vec![(HeaderName::ReceiptId, "a:b\nc\\d".to_string())],
            "",
        )
        .unwrap();
        let parsed = parse(&serialize(&frame)).unwrap();
        assert_eq!(parsed.header(&HeaderName::ReceiptId), Some("a:b\nc\\d"));
    }

    #[test]
    fn test_parse_honors_content_length() {
        // The body contains a NUL, which only content-length makes parseable.
        let wire = "MESSAGE\n\
                    subscription:s-1\n\
                    message-id:m-1\n\
                    destination:/d\n\
                    content-length:3\n\
                    \n\
                    a\0b\0";
        let frame = parse(wire).unwrap();
        assert_eq!(frame.body(), "a\0b");
    }

    #[test]
    fn test_parse_content_length_mismatch_is_rejected() {
        let wire = "MESSAGE\n\
                    subscription:s-1\n\
                    message-id:m-1\n\
                    destination:/d\n\
                    content-length:10\n\
                    \n\
                    abc\0";
        let result = parse(wire);
        assert!(matches!(result, Err(FrameError::LengthMismatch { declared: 10, .. })));
    }

    #[test]
    fn test_parse_ignores_trailing_whitespace_after_null() {
        let frame = parse("RECEIPT\nreceipt-id:r-1\n\n\0\n\n  ").unwrap();
        assert_eq!(frame.command(), StompCommand::Receipt);
    }

    #[test]
    fn test_parse_rejects_trailing_garbage_after_null() {
        let result = parse("RECEIPT\nreceipt-id:r-1\n\n\0garbage");
        assert!(matches!(result, Err(FrameError::MalformedHeader(_))));
    }

    #[test]
    fn test_parse_accepts_crlf_line_endings() {
        let frame = parse("CONNECTED\r\nversion:1.2\r\n\r\n\0").unwrap();
        assert_eq!(frame.command(), StompCommand::Connected);
        assert_eq!(frame.header(&HeaderName::Version), Some("1.2"));
    }

    #[test]
    fn test_parse_preserves_unknown_headers() {
        let frame = parse("CONNECTED\nversion:1.2\nserver:ltnm/1.0\n\n\0").unwrap();
        assert_eq!(
            frame.header(&HeaderName::Other("server".to_string())),
            Some("ltnm/1.0")
        );
    }

    #[test]
    fn test_parse_empty_body_yields_empty_string() {
        let frame = parse("CONNECTED\nversion:1.2\n\n\0").unwrap();
        assert_eq!(frame.body(), "");
    }

    #[test]
    fn test_parsed_client_frames_carry_their_required_headers() {
        // Every frame this client emits must parse back with at least the
        // required header set for its command.
        let subscribe = parse(&Frame::subscribe("id-1", "/passengers").unwrap().to_wire()).unwrap();
        for header in [HeaderName::Destination, HeaderName::Id, HeaderName::Ack] {
            assert!(subscribe.header(&header).is_some(), "missing {header}");
        }

        let connect = parse(&Frame::stomp_connect("h", "u", "p").unwrap().to_wire()).unwrap();
        for header in [
            HeaderName::AcceptVersion,
            HeaderName::Host,
            HeaderName::Login,
            HeaderName::Passcode,
        ] {
            assert!(connect.header(&header).is_some(), "missing {header}");
        }
    }
}
