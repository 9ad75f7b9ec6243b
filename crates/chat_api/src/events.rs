use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

/// Prefix that marks a frame as carrying a payload.
pub const DATA_PREFIX: &str = "data: ";
/// Payload sentinel that terminates a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Typed event decoded from one stream frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProtocolEvent {
    SessionAssigned { session_id: String },
    TypingStatus { active: bool },
    TextDelta { fragment: String },
    StreamEnd,
}

impl ProtocolEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StreamEnd)
    }
}

/// Decode a single frame into the events it carries.
///
/// Frames that do not start with `data: ` carry nothing and decode to an
/// empty list. One payload may carry several facets at once (a session id
/// riding on a typing frame, say); they are returned in the order session,
/// typing, text. A payload that is not valid JSON is a [`DecodeError`].
pub fn decode_frame(frame: &str) -> Result<Vec<ProtocolEvent>, DecodeError> {
    let Some(payload) = frame.strip_prefix(DATA_PREFIX) else {
        return Ok(Vec::new());
    };

    if payload == DONE_SENTINEL {
        return Ok(vec![ProtocolEvent::StreamEnd]);
    }

    let value = serde_json::from_str::<Value>(payload).map_err(|source| {
        DecodeError::MalformedPayload {
            payload: payload.to_owned(),
            source,
        }
    })?;

    Ok(map_payload(&value))
}

fn map_payload(value: &Value) -> Vec<ProtocolEvent> {
    let mut events = Vec::new();

    if let Some(session_id) = non_empty_str(value.get("sessionId")) {
        events.push(ProtocolEvent::SessionAssigned {
            session_id: session_id.to_owned(),
        });
    }

    if value.get("type").and_then(Value::as_str) == Some("typing") {
        if let Some(active) = value.get("status").and_then(Value::as_bool) {
            events.push(ProtocolEvent::TypingStatus { active });
        }
    }

    if let Some(fragment) = non_empty_str(value.get("chunk")) {
        events.push(ProtocolEvent::TextDelta {
            fragment: fragment.to_owned(),
        });
    }

    events
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{decode_frame, ProtocolEvent};

    #[test]
    fn non_data_frames_decode_to_nothing() {
        assert_eq!(decode_frame("").expect("blank frame"), Vec::new());
        assert_eq!(decode_frame(": keepalive").expect("comment"), Vec::new());
        assert_eq!(decode_frame("data:[DONE]").expect("no space"), Vec::new());
    }

    #[test]
    fn typing_without_boolean_status_is_ignored() {
        let events = decode_frame(r#"data: {"type":"typing","status":"yes"}"#).expect("valid json");
        assert!(events.is_empty());
    }

    #[test]
    fn non_object_payloads_carry_no_facets() {
        assert!(decode_frame("data: 42").expect("number").is_empty());
        assert!(decode_frame("data: null").expect("null").is_empty());
    }

    #[test]
    fn stream_end_is_terminal() {
        assert!(ProtocolEvent::StreamEnd.is_terminal());
        assert!(!ProtocolEvent::TypingStatus { active: true }.is_terminal());
    }
}
