//! Framing for the JSON hub protocol spoken by the Impostor event hub.
//!
//! Every record is a JSON object terminated by the ASCII record separator
//! `0x1E`. A single WebSocket frame may carry several records.
//!
//! ```text
//! client → hub   {"protocol":"json","version":1}␞        handshake
//! hub → client   {}␞                                      handshake ok
//! hub → client   {"type":1,"target":"PlayerMove","arguments":["red",{"x":1,"y":2}]}␞
//! either way     {"type":6}␞                              ping
//! hub → client   {"type":7,"error":"..."}␞                close
//! ```
//!
//! The client dials the hub's WebSocket endpoint directly. There is no
//! negotiate round-trip.

use proxchat_protocol::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminates every record.
pub const RECORD_SEPARATOR: u8 = 0x1E;

const INVOCATION: u8 = 1;
const PING: u8 = 6;
const CLOSE: u8 = 7;

/// One decoded hub record.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// A method call from the hub: the name of an event and its arguments.
    Invocation { target: String, arguments: Vec<Value> },
    Ping,
    /// The hub is closing the connection, optionally with a reason.
    Close { error: Option<String> },
    /// Any other message type (completions, stream items). Ignored.
    Other(u8),
}

#[derive(Deserialize)]
struct HandshakeResponse {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct OutgoingInvocation<'a> {
    #[serde(rename = "type")]
    kind: u8,
    target: &'a str,
    arguments: &'a [Value],
}

#[derive(Deserialize)]
struct IncomingRecord {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

fn terminate(mut json: String) -> String {
    json.push(RECORD_SEPARATOR as char);
    json
}

fn invalid(e: impl std::fmt::Display) -> ProtocolError {
    ProtocolError::InvalidEventData(e.to_string())
}

/// The handshake record the client sends first.
pub fn handshake_request() -> String {
    terminate(r#"{"protocol":"json","version":1}"#.to_string())
}

/// Checks the hub's handshake answer.
///
/// `Ok(())` for `{}`; the hub's reason as `InvalidEventData` otherwise.
pub fn parse_handshake_response(record: &[u8]) -> Result<(), ProtocolError> {
    let response: HandshakeResponse = serde_json::from_slice(record).map_err(invalid)?;
    match response.error {
        None => Ok(()),
        Some(reason) => Err(ProtocolError::InvalidEventData(format!(
            "hub rejected handshake: {reason}"
        ))),
    }
}

/// A terminated invocation record.
pub fn encode_invocation(target: &str, arguments: &[Value]) -> Result<String, ProtocolError> {
    let body = serde_json::to_string(&OutgoingInvocation {
        kind: INVOCATION,
        target,
        arguments,
    })
    .map_err(ProtocolError::Encode)?;
    Ok(terminate(body))
}

/// A terminated ping record.
pub fn encode_ping() -> String {
    terminate(format!(r#"{{"type":{PING}}}"#))
}

/// Splits a frame into its records, skipping empty ones.
pub fn split_records(frame: &[u8]) -> impl Iterator<Item = &[u8]> {
    frame
        .split(|b| *b == RECORD_SEPARATOR)
        .filter(|r| !r.iter().all(u8::is_ascii_whitespace))
}

/// Decodes one record (without its separator).
pub fn parse_record(record: &[u8]) -> Result<HubMessage, ProtocolError> {
    let raw: IncomingRecord = serde_json::from_slice(record).map_err(invalid)?;
    Ok(match raw.kind {
        INVOCATION => HubMessage::Invocation {
            target: raw
                .target
                .ok_or_else(|| invalid("invocation without a target"))?,
            arguments: raw.arguments,
        },
        PING => HubMessage::Ping,
        CLOSE => HubMessage::Close { error: raw.error },
        other => HubMessage::Other(other),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_handshake_request_is_terminated_json() {
        let hs = handshake_request();
        assert!(hs.ends_with('\u{1e}'));
        let body: Value = serde_json::from_str(hs.trim_end_matches('\u{1e}')).unwrap();
        assert_eq!(body, json!({"protocol": "json", "version": 1}));
    }

    #[test]
    fn test_handshake_response_error_is_reported() {
        assert!(parse_handshake_response(b"{}").is_ok());
        let err = parse_handshake_response(br#"{"error":"nope"}"#).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_encode_invocation_shape() {
        let rec = encode_invocation("TrackGame", &[json!("ABCDEF")]).unwrap();
        let body: Value = serde_json::from_str(rec.trim_end_matches('\u{1e}')).unwrap();
        assert_eq!(
            body,
            json!({"type": 1, "target": "TrackGame", "arguments": ["ABCDEF"]})
        );
    }

    #[test]
    fn test_split_records_handles_batches_and_trailing_separator() {
        let frame = b"{\"type\":6}\x1e{\"type\":1,\"target\":\"GameEnd\",\"arguments\":[]}\x1e";
        let records: Vec<_> = split_records(frame).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(parse_record(records[0]).unwrap(), HubMessage::Ping);
        assert_eq!(
            parse_record(records[1]).unwrap(),
            HubMessage::Invocation {
                target: "GameEnd".into(),
                arguments: vec![]
            }
        );
    }

    #[test]
    fn test_parse_close_with_error() {
        let msg = parse_record(br#"{"type":7,"error":"server shutting down"}"#).unwrap();
        assert_eq!(
            msg,
            HubMessage::Close {
                error: Some("server shutting down".into())
            }
        );
    }

    #[test]
    fn test_parse_unknown_type_is_other() {
        assert_eq!(parse_record(br#"{"type":3,"invocationId":"1"}"#).unwrap(), HubMessage::Other(3));
    }

    #[test]
    fn test_parse_invocation_without_target_is_invalid() {
        let err = parse_record(br#"{"type":1,"arguments":[]}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidEventData(_)));
    }

    #[test]
    fn test_parse_garbage_is_invalid() {
        assert!(matches!(
            parse_record(b"not json"),
            Err(ProtocolError::InvalidEventData(_))
        ));
    }
}
