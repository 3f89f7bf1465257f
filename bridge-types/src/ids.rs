//! Identity types for the portal bridge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::EntryError;

/// Stable identifier of a local bridge identity (e.g. `@alice:example.org`).
///
/// Opaque to this crate; never changes once a user is created.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Numeric id of an identity or conversation on the remote network.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(i64);

impl RemoteId {
    /// Create a RemoteId from its raw value.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteId({})", self.0)
    }
}

impl From<i64> for RemoteId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Kind of remote conversation a peer reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerKind {
    /// One-to-one conversation with a user.
    User,
    /// Basic group chat.
    Chat,
    /// Channel or supergroup.
    Channel,
}

impl PeerKind {
    /// Lowercase name used in keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerKind::User => "user",
            PeerKind::Chat => "chat",
            PeerKind::Channel => "channel",
        }
    }
}

impl FromStr for PeerKind {
    type Err = EntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(PeerKind::User),
            "chat" => Ok(PeerKind::Chat),
            "channel" => Ok(PeerKind::Channel),
            other => Err(EntryError::InvalidData(format!("unknown peer kind: {other}"))),
        }
    }
}

/// Key identifying one remote conversation.
///
/// Only ever used to look conversations up in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerReference {
    /// Conversation kind.
    pub kind: PeerKind,
    /// Remote id within that kind.
    pub id: RemoteId,
}

impl PeerReference {
    /// Create a new peer reference.
    pub const fn new(kind: PeerKind, id: RemoteId) -> Self {
        Self { kind, id }
    }

    /// Reference to a one-to-one conversation.
    pub const fn user(id: i64) -> Self {
        Self::new(PeerKind::User, RemoteId::new(id))
    }

    /// Reference to a basic group.
    pub const fn chat(id: i64) -> Self {
        Self::new(PeerKind::Chat, RemoteId::new(id))
    }

    /// Reference to a channel.
    pub const fn channel(id: i64) -> Self {
        Self::new(PeerKind::Channel, RemoteId::new(id))
    }
}

impl fmt::Display for PeerReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

impl FromStr for PeerReference {
    type Err = EntryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| EntryError::InvalidData(format!("malformed peer reference: {s}")))?;
        let id = id
            .parse::<i64>()
            .map_err(|e| EntryError::InvalidData(format!("malformed peer id {id:?}: {e}")))?;
        Ok(Self::new(kind.parse()?, RemoteId::new(id)))
    }
}
