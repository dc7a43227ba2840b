//! Signaling Protocol Types

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::constants::*;

/// Errors raised while reading the relay-visible part of a message
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Not a JSON object, or fields of the wrong shape
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// JSON object without a `type` field
    #[error("message has no type")]
    MissingType,
    /// `identify` with a role other than broadcaster/viewer
    #[error("invalid role: {0}")]
    InvalidRole(String),
}

/// Session role a connection can claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Broadcaster,
    Viewer,
}

impl Role {
    /// The role on the other end of the session
    pub fn counterpart(self) -> Role {
        match self {
            Role::Broadcaster => Role::Viewer,
            Role::Viewer => Role::Broadcaster,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Broadcaster => ROLE_BROADCASTER,
            Role::Viewer => ROLE_VIEWER,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_BROADCASTER => Ok(Role::Broadcaster),
            ROLE_VIEWER => Ok(Role::Viewer),
            other => Err(ProtocolError::InvalidRole(other.to_string())),
        }
    }
}

/// A frame exactly as it arrived on the wire.
///
/// Text stays text and binary stays binary so the counterpart receives the
/// same frame kind and the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Bytes),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// The only part of a signaling message the relay looks at.
///
/// Every other field is left untouched in the original payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    role: Option<serde_json::Value>,
}

impl Envelope {
    /// Parse the envelope out of a raw payload
    pub fn parse(raw: &[u8]) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_slice(raw)?;
        if envelope.kind.is_none() {
            return Err(ProtocolError::MissingType);
        }
        Ok(envelope)
    }

    /// Message type tag
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or_default()
    }

    pub fn is_identify(&self) -> bool {
        self.kind() == MSG_TYPE_IDENTIFY
    }

    /// Role requested by an `identify` message
    pub fn requested_role(&self) -> Result<Role, ProtocolError> {
        match &self.role {
            Some(serde_json::Value::String(role)) => role.parse(),
            Some(other) => Err(ProtocolError::InvalidRole(other.to_string())),
            None => Err(ProtocolError::InvalidRole("<missing>".to_string())),
        }
    }
}
