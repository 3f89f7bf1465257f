//! Persisted shape of a bridge user.
//!
//! ```json
//! { "type": "user", "id": "@alice:example.org",
//!   "data": { "phoneNumber": "...", "phoneCodeHash": "...",
//!             "contactIDs": [1, 2], "puppet": "<base64>" } }
//! ```

use serde::{Deserialize, Serialize};

use crate::{EntryError, RemoteId, SessionSnapshot, UserId};

/// Entry kind written for bridge users.
pub const USER_ENTRY_TYPE: &str = "user";

/// A typed persisted entry for one bridge user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// Entry kind discriminator.
    #[serde(rename = "type")]
    pub kind: String,
    /// Local identity this entry belongs to.
    pub id: UserId,
    /// Aggregate state.
    pub data: UserEntryData,
}

/// Stored fields of a bridge user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntryData {
    /// Phone number of an in-progress login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Handshake hash of an outstanding login code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_code_hash: Option<String>,
    /// Ids of the cached contacts, in cache order.
    #[serde(default, rename = "contactIDs")]
    pub contact_ids: Vec<RemoteId>,
    /// Serialized remote session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puppet: Option<SessionSnapshot>,
}

impl UserEntry {
    /// Build a user entry.
    pub fn new(id: UserId, data: UserEntryData) -> Self {
        Self {
            kind: USER_ENTRY_TYPE.to_string(),
            id,
            data,
        }
    }

    /// Check that this entry describes a bridge user.
    pub fn expect_user(&self) -> Result<(), EntryError> {
        if self.kind == USER_ENTRY_TYPE {
            Ok(())
        } else {
            Err(EntryError::WrongType {
                expected: USER_ENTRY_TYPE.to_string(),
                actual: self.kind.clone(),
            })
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, EntryError> {
        serde_json::to_string(self).map_err(EntryError::Serialization)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, EntryError> {
        serde_json::from_str(json).map_err(EntryError::Serialization)
    }
}
