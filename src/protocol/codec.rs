//! JSON encoding and decoding of messages.
//!
//! Decoding fails closed: a message whose `"type"` tag is missing or not one
//! of the known client tags is rejected before any field is looked at.

use serde_json::Value;
use thiserror::Error;

use super::messages::{ClientMessage, ServerMessage};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("message has no type")]
    MissingType,
}

pub fn decode_client(bytes: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    if !ClientMessage::TYPES.contains(&tag) {
        return Err(ProtocolError::UnknownType(tag.to_string()));
    }
    serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

pub fn encode_server(message: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Decodes a server message, as a client would.
pub fn decode_server(s: &str) -> Result<ServerMessage, ProtocolError> {
    serde_json::from_str(s).map_err(|e| ProtocolError::Malformed(e.to_string()))
}
