//! Registries resolving remote ids to local objects.
//!
//! The bridge user never builds contacts or conversations itself; it asks
//! a [`ContactRegistry`] or [`ConversationRegistry`] for the local object
//! matching a remote id and tells that object to refresh itself from a
//! remote snapshot.

mod memory;

pub use memory::{MemoryContactRegistry, MemoryConversation, MemoryConversationRegistry};

use crate::session::RemoteSession;
use async_trait::async_trait;
use portal_bridge_types::{Contact, PeerReference, RemoteDialog, RemoteId, RemoteUser, UserId};
use std::sync::Arc;
use thiserror::Error;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Refreshing an object from remote data failed.
    #[error("update of {target} failed: {reason}")]
    UpdateFailed {
        /// Object being updated.
        target: String,
        /// What went wrong.
        reason: String,
    },

    /// Creating or inviting into the local room failed.
    #[error("room for {peer} could not be created: {reason}")]
    RoomFailed {
        /// Conversation the room belongs to.
        peer: PeerReference,
        /// What went wrong.
        reason: String,
    },

    /// Backing storage failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Resolves remote identity ids to local contacts.
#[async_trait]
pub trait ContactRegistry: Send + Sync {
    /// Fetch the contact for `id`, creating an empty one if unknown.
    async fn get_or_create(&self, id: RemoteId) -> Result<Contact, RegistryError>;

    /// Refresh `contact` from `info` and store the result.
    ///
    /// With `force_fresh` every field is overwritten rather than merged.
    /// Returns whether the contact changed.
    async fn update_from_remote(
        &self,
        session: &dyn RemoteSession,
        contact: &mut Contact,
        info: &RemoteUser,
        force_fresh: bool,
    ) -> Result<bool, RegistryError>;
}

/// Local representation of one remote conversation.
#[async_trait]
pub trait Conversation: Send + Sync {
    /// Conversation key.
    fn peer(&self) -> PeerReference;

    /// Refresh tracked info from the remote snapshot.
    ///
    /// Returns whether anything material changed.
    async fn update_info(
        &self,
        session: &dyn RemoteSession,
        dialog: &RemoteDialog,
    ) -> Result<bool, RegistryError>;

    /// Create the visible local room if needed and invite `invite`.
    async fn materialize_room(
        &self,
        session: &dyn RemoteSession,
        invite: &[UserId],
    ) -> Result<(), RegistryError>;
}

/// Resolves peer references to conversations.
#[async_trait]
pub trait ConversationRegistry: Send + Sync {
    /// Fetch the conversation for `peer`, creating it if unknown.
    async fn get_or_create_by_peer(
        &self,
        peer: PeerReference,
    ) -> Result<Arc<dyn Conversation>, RegistryError>;
}
