//! WebSocket Message Types
//!
//! Defines the wire shapes exchanged between hub clients (sources, browser
//! dashboards) and the hub.
//!
//! Client commands carry no type tag. Each shape is a JSON object identified
//! by its one required field, so decoding tries the shapes in a fixed order
//! and keeps the first that fits:
//!
//! | Order | Shape         | Field         | Type   |
//! |-------|---------------|---------------|--------|
//! | 1     | `Publish`     | `publish`     | number |
//! | 2     | `Subscribe`   | `subscribe`   | string |
//! | 3     | `Unsubscribe` | `unsubscribe` | string |
//! | 4     | `SetName`     | `name`        | string |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A command sent from a client to the hub
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Forward a sample to every listener of the sending source
    Publish {
        /// The sample value
        value: f64,
    },
    /// Start receiving samples from the source with this uuid
    Subscribe {
        /// Target source uuid
        target: String,
    },
    /// Stop receiving samples from the source with this uuid
    Unsubscribe {
        /// Target source uuid
        target: String,
    },
    /// Set a display name, which also marks the sender as a source
    SetName {
        /// New display name
        name: String,
    },
}

#[derive(Serialize, Deserialize)]
struct PublishShape {
    publish: f64,
}

#[derive(Serialize, Deserialize)]
struct SubscribeShape {
    subscribe: String,
}

#[derive(Serialize, Deserialize)]
struct UnsubscribeShape {
    unsubscribe: String,
}

#[derive(Serialize, Deserialize)]
struct SetNameShape {
    name: String,
}

type ShapeDecoder = fn(&Value) -> Option<Command>;

/// Known command shapes in priority order.
const SHAPES: [(&str, ShapeDecoder); 4] = [
    ("publish", decode_publish),
    ("subscribe", decode_subscribe),
    ("unsubscribe", decode_unsubscribe),
    ("name", decode_set_name),
];

fn decode_publish(value: &Value) -> Option<Command> {
    PublishShape::deserialize(value)
        .ok()
        .map(|s| Command::Publish { value: s.publish })
}

fn decode_subscribe(value: &Value) -> Option<Command> {
    SubscribeShape::deserialize(value)
        .ok()
        .map(|s| Command::Subscribe {
            target: s.subscribe,
        })
}

fn decode_unsubscribe(value: &Value) -> Option<Command> {
    UnsubscribeShape::deserialize(value)
        .ok()
        .map(|s| Command::Unsubscribe {
            target: s.unsubscribe,
        })
}

fn decode_set_name(value: &Value) -> Option<Command> {
    SetNameShape::deserialize(value)
        .ok()
        .map(|s| Command::SetName { name: s.name })
}

impl Command {
    /// Decode a text payload into a command
    ///
    /// Returns [`CodecError::Unrecognized`] when the payload is valid JSON
    /// but fits none of the known shapes. Extra fields are ignored, so a
    /// payload carrying several command fields resolves to the first shape
    /// in priority order.
    pub fn decode(text: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(text)?;
        // serde would happily fill a struct from a JSON array
        if !value.is_object() {
            return Err(CodecError::Unrecognized);
        }

        SHAPES
            .iter()
            .find_map(|(_, decode)| decode(&value))
            .ok_or(CodecError::Unrecognized)
    }

    /// Encode this command as a client would send it
    pub fn encode(&self) -> Result<String, CodecError> {
        let encoded = match self {
            Command::Publish { value } => serde_json::to_string(&PublishShape { publish: *value }),
            Command::Subscribe { target } => serde_json::to_string(&SubscribeShape {
                subscribe: target.clone(),
            }),
            Command::Unsubscribe { target } => serde_json::to_string(&UnsubscribeShape {
                unsubscribe: target.clone(),
            }),
            Command::SetName { name } => serde_json::to_string(&SetNameShape { name: name.clone() }),
        };
        encoded.map_err(CodecError::Encode)
    }

    /// Wire field that identifies this command's shape
    pub fn field(&self) -> &'static str {
        let index = match self {
            Command::Publish { .. } => 0,
            Command::Subscribe { .. } => 1,
            Command::Unsubscribe { .. } => 2,
            Command::SetName { .. } => 3,
        };
        SHAPES[index].0
    }
}

/// Public description of a connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDescription {
    /// Display name (the uuid until the client names itself)
    pub display_name: String,
    /// Server-assigned identifier used for addressing
    pub uuid: String,
}

/// Messages sent from the hub to clients
///
/// Like commands, these are distinguished by field name only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Sent once, right after the connection is accepted
    Connect {
        /// The uuid assigned to the receiving connection
        uuid: String,
    },
    /// Current list of sources, pushed to every connection
    Sources {
        /// Descriptions of all connections that have set a name
        sources: Vec<ClientDescription>,
    },
    /// A sample forwarded from a subscribed source
    Publish {
        /// The sample value
        publish: f64,
    },
}

impl ServerMessage {
    /// Encode as canonical JSON text
    pub fn encode(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::Encode)
    }
}

/// Errors produced by the message codec
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload is not JSON at all
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload is JSON but matches no command shape
    #[error("Payload matches no known command")]
    Unrecognized,

    /// Outbound message could not be serialized
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_each_shape() {
        assert_eq!(
            Command::decode(r#"{"publish": 72.5}"#).unwrap(),
            Command::Publish { value: 72.5 }
        );
        assert_eq!(
            Command::decode(r#"{"subscribe": "abc"}"#).unwrap(),
            Command::Subscribe {
                target: "abc".to_string()
            }
        );
        assert_eq!(
            Command::decode(r#"{"unsubscribe": "abc"}"#).unwrap(),
            Command::Unsubscribe {
                target: "abc".to_string()
            }
        );
        assert_eq!(
            Command::decode(r#"{"name": "ECG-1"}"#).unwrap(),
            Command::SetName {
                name: "ECG-1".to_string()
            }
        );
    }

    #[test]
    fn test_decode_integer_publish() {
        let cmd = Command::decode(r#"{"publish": 72}"#).unwrap();
        assert_eq!(cmd, Command::Publish { value: 72.0 });
    }

    #[test]
    fn test_decode_wrong_field_type_is_unrecognized() {
        // A string sample does not satisfy the publish shape
        let err = Command::decode(r#"{"publish": "72"}"#).unwrap_err();
        assert!(matches!(err, CodecError::Unrecognized));

        let err = Command::decode(r#"{"subscribe": 5}"#).unwrap_err();
        assert!(matches!(err, CodecError::Unrecognized));
    }

    #[test]
    fn test_decode_unknown_and_malformed() {
        assert!(matches!(
            Command::decode(r#"{"register": "x"}"#),
            Err(CodecError::Unrecognized)
        ));
        assert!(matches!(
            Command::decode("[72.5]"),
            Err(CodecError::Unrecognized)
        ));
        assert!(matches!(
            Command::decode("not json"),
            Err(CodecError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_priority_order() {
        let cmd = Command::decode(r#"{"name": "x", "subscribe": "u1", "publish": 1.0}"#).unwrap();
        assert_eq!(cmd, Command::Publish { value: 1.0 });

        let cmd = Command::decode(r#"{"unsubscribe": "u2", "subscribe": "u1"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Subscribe {
                target: "u1".to_string()
            }
        );
    }

    #[test]
    fn test_command_field() {
        assert_eq!(Command::Publish { value: 0.0 }.field(), "publish");
        assert_eq!(
            Command::SetName {
                name: String::new()
            }
            .field(),
            "name"
        );
    }

    #[test]
    fn test_command_encode() {
        let json = Command::SetName {
            name: "ECG-1".to_string(),
        }
        .encode()
        .unwrap();
        assert_eq!(json, r#"{"name":"ECG-1"}"#);
    }

    #[test]
    fn test_server_message_serialize_connect() {
        let msg = ServerMessage::Connect {
            uuid: "u1".to_string(),
        };
        assert_eq!(msg.encode().unwrap(), r#"{"uuid":"u1"}"#);
    }

    #[test]
    fn test_server_message_serialize_sources() {
        let msg = ServerMessage::Sources {
            sources: vec![ClientDescription {
                display_name: "ECG-1".to_string(),
                uuid: "u1".to_string(),
            }],
        };
        assert_eq!(
            msg.encode().unwrap(),
            r#"{"sources":[{"displayName":"ECG-1","uuid":"u1"}]}"#
        );

        let empty = ServerMessage::Sources { sources: vec![] };
        assert_eq!(empty.encode().unwrap(), r#"{"sources":[]}"#);
    }

    #[test]
    fn test_server_message_serialize_publish() {
        let msg = ServerMessage::Publish { publish: 72.5 };
        assert_eq!(msg.encode().unwrap(), r#"{"publish":72.5}"#);
    }

    #[test]
    fn test_server_message_deserialize() {
        let msg: ServerMessage = serde_json::from_str(r#"{"sources":[]}"#).unwrap();
        assert_eq!(msg, ServerMessage::Sources { sources: vec![] });

        let msg: ServerMessage = serde_json::from_str(r#"{"uuid":"u1"}"#).unwrap();
        assert!(matches!(msg, ServerMessage::Connect { .. }));
    }
}
