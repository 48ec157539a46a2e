//! Page/worker message protocol.
//!
//! Messages are JSON objects whose fields are significant by presence:
//!
//! - `{"statusUpdate": {"isOnline": bool}}` carries a connectivity update
//!   (page → worker, or page reply on a port).
//! - `{"requestStatusUpdate": true}` asks the page to resend its status
//!   (worker → page).
//!
//! Decoding is lenient. Anything that doesn't match one of the shapes
//! decodes to [`Message::Unknown`] and is treated as a no-op by both ends.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connectivity payload of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub is_online: bool,
}

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    StatusUpdate(StatusUpdate),
    RequestStatusUpdate,
    /// Anything else, kept for logging.
    Unknown(Value),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_update: Option<StatusUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_status_update: Option<bool>,
}

impl Message {
    pub fn status(is_online: bool) -> Self {
        Message::StatusUpdate(StatusUpdate { is_online })
    }

    /// Decode a message from its JSON value.
    ///
    /// A `statusUpdate` wins over `requestStatusUpdate` when both are present,
    /// since the worker acts on the former and the page on the latter.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<Envelope>(value.clone()) {
            Ok(Envelope { status_update: Some(update), .. }) => Message::StatusUpdate(update),
            Ok(Envelope { request_status_update: Some(true), .. }) => Message::RequestStatusUpdate,
            _ => Message::Unknown(value),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Message::StatusUpdate(update) => {
                serde_json::to_value(Envelope { status_update: Some(*update), request_status_update: None })
                    .unwrap_or(Value::Null)
            }
            Message::RequestStatusUpdate => {
                serde_json::to_value(Envelope { status_update: None, request_status_update: Some(true) })
                    .unwrap_or(Value::Null)
            }
            Message::Unknown(value) => value.clone(),
        }
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        Message::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_status_update() {
        let message = Message::from_value(json!({"statusUpdate": {"isOnline": false}}));
        assert_eq!(message, Message::status(false));
    }

    #[test]
    fn test_decode_request_status_update() {
        let message = Message::from_value(json!({"requestStatusUpdate": true}));
        assert_eq!(message, Message::RequestStatusUpdate);
    }

    #[test]
    fn test_request_status_update_false_is_unknown() {
        let message = Message::from_value(json!({"requestStatusUpdate": false}));
        assert!(matches!(message, Message::Unknown(_)));
    }

    #[test]
    fn test_malformed_status_update_is_unknown() {
        for value in [
            json!({"statusUpdate": {}}),
            json!({"statusUpdate": {"isOnline": "yes"}}),
            json!({"statusUpdate": true}),
            json!("hello"),
            json!(null),
        ] {
            assert!(matches!(Message::from_value(value), Message::Unknown(_)));
        }
    }

    #[test]
    fn test_encode_wire_shape() {
        assert_eq!(Message::status(true).to_value(), json!({"statusUpdate": {"isOnline": true}}));
        assert_eq!(Message::RequestStatusUpdate.to_value(), json!({"requestStatusUpdate": true}));
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let message = Message::from_value(json!({"statusUpdate": {"isOnline": true, "since": 12}, "other": 1}));
        assert_eq!(message, Message::status(true));
    }
}
