//! Snapshots of remote-network objects as returned by a remote session.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::{PeerReference, RemoteId};

/// Profile of a remote identity as the remote side reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    /// Remote identity id.
    pub id: RemoteId,
    /// First name, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Public username, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Phone number, if visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl RemoteUser {
    /// A profile with only the id set.
    pub fn new(id: i64) -> Self {
        Self {
            id: RemoteId::new(id),
            ..Self::default()
        }
    }

    /// Set the first and last name.
    pub fn with_name(mut self, first: &str, last: &str) -> Self {
        self.first_name = Some(first.to_string()).filter(|s| !s.is_empty());
        self.last_name = Some(last.to_string()).filter(|s| !s.is_empty());
        self
    }

    /// Set the username.
    pub fn with_username(mut self, username: &str) -> Self {
        self.username = Some(username.to_string());
        self
    }

    /// Set the phone number.
    pub fn with_phone(mut self, phone: &str) -> Self {
        self.phone_number = Some(phone.to_string());
        self
    }
}

/// One entry of the remote conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDialog {
    /// Conversation this dialog refers to.
    pub peer: PeerReference,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Account was kicked or banned from this conversation.
    #[serde(default)]
    pub forbidden: bool,
    /// Conversation was migrated or shut down remotely.
    #[serde(default)]
    pub deactivated: bool,
}

impl RemoteDialog {
    /// A live dialog with the given title.
    pub fn new(peer: PeerReference, title: &str) -> Self {
        Self {
            peer,
            title: title.to_string(),
            forbidden: false,
            deactivated: false,
        }
    }

    /// Mark the dialog forbidden.
    pub fn forbidden(mut self) -> Self {
        self.forbidden = true;
        self
    }

    /// Mark the dialog deactivated.
    pub fn deactivated(mut self) -> Self {
        self.deactivated = true;
        self
    }

    /// Whether this dialog should be mirrored at all.
    pub fn is_mirrorable(&self) -> bool {
        !self.forbidden && !self.deactivated
    }
}

/// Opaque serialized state of a remote session.
///
/// Stored as base64 in persisted entries.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot(Vec<u8>);

impl SessionSnapshot {
    /// Wrap raw session bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw session bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True if the snapshot carries no state.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionSnapshot([{} bytes REDACTED])", self.0.len())
    }
}

impl Serialize for SessionSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for SessionSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(SessionSnapshot)
            .map_err(serde::de::Error::custom)
    }
}
