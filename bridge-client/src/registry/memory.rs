//! In-memory registries.
//!
//! Used by tests and by hosts that keep no state between runs. Failures can
//! be forced per id so partial-failure behavior is observable.

use super::{Conversation, ContactRegistry, ConversationRegistry, RegistryError};
use crate::session::RemoteSession;
use async_trait::async_trait;
use portal_bridge_types::{Contact, PeerReference, RemoteDialog, RemoteId, RemoteUser, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Contacts kept in a map keyed by remote id.
#[derive(Debug, Clone, Default)]
pub struct MemoryContactRegistry {
    inner: Arc<Mutex<ContactRegistryInner>>,
}

#[derive(Debug, Default)]
struct ContactRegistryInner {
    contacts: HashMap<RemoteId, Contact>,
    failing_updates: HashSet<RemoteId>,
    updates: usize,
}

impl MemoryContactRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a contact directly.
    pub fn insert(&self, contact: Contact) {
        let mut inner = self.inner.lock().unwrap();
        inner.contacts.insert(contact.id, contact);
    }

    /// Look a contact up without creating it.
    pub fn get(&self, id: RemoteId) -> Option<Contact> {
        let inner = self.inner.lock().unwrap();
        inner.contacts.get(&id).cloned()
    }

    /// Make every update of `id` fail.
    pub fn fail_updates_for(&self, id: RemoteId) {
        let mut inner = self.inner.lock().unwrap();
        inner.failing_updates.insert(id);
    }

    /// Number of successful updates so far.
    pub fn update_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.updates
    }
}

#[async_trait]
impl ContactRegistry for MemoryContactRegistry {
    async fn get_or_create(&self, id: RemoteId) -> Result<Contact, RegistryError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .contacts
            .entry(id)
            .or_insert_with(|| Contact::new(id))
            .clone())
    }

    async fn update_from_remote(
        &self,
        _session: &dyn RemoteSession,
        contact: &mut Contact,
        info: &RemoteUser,
        force_fresh: bool,
    ) -> Result<bool, RegistryError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_updates.contains(&contact.id) {
            return Err(RegistryError::UpdateFailed {
                target: format!("contact {}", contact.id),
                reason: "forced failure".to_string(),
            });
        }
        let changed = contact.apply_remote(info, force_fresh);
        inner.contacts.insert(contact.id, contact.clone());
        inner.updates += 1;
        Ok(changed)
    }
}

/// A conversation tracked in memory.
#[derive(Debug)]
pub struct MemoryConversation {
    peer: PeerReference,
    state: Mutex<ConversationState>,
}

#[derive(Debug, Default)]
struct ConversationState {
    title: Option<String>,
    invited: Option<Vec<UserId>>,
    room_error: Option<String>,
    room_attempts: usize,
}

impl MemoryConversation {
    fn new(peer: PeerReference) -> Self {
        Self {
            peer,
            state: Mutex::new(ConversationState::default()),
        }
    }

    /// Title last seen from the remote side.
    pub fn title(&self) -> Option<String> {
        self.state.lock().unwrap().title.clone()
    }

    /// Users invited to the room, if the room exists.
    pub fn invited(&self) -> Option<Vec<UserId>> {
        self.state.lock().unwrap().invited.clone()
    }

    /// Number of times room creation was attempted.
    pub fn room_attempts(&self) -> usize {
        self.state.lock().unwrap().room_attempts
    }
}

#[async_trait]
impl Conversation for MemoryConversation {
    fn peer(&self) -> PeerReference {
        self.peer
    }

    async fn update_info(
        &self,
        _session: &dyn RemoteSession,
        dialog: &RemoteDialog,
    ) -> Result<bool, RegistryError> {
        let mut state = self.state.lock().unwrap();
        if state.title.as_deref() == Some(dialog.title.as_str()) {
            return Ok(false);
        }
        state.title = Some(dialog.title.clone());
        Ok(true)
    }

    async fn materialize_room(
        &self,
        _session: &dyn RemoteSession,
        invite: &[UserId],
    ) -> Result<(), RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.room_attempts += 1;
        if let Some(reason) = state.room_error.clone() {
            return Err(RegistryError::RoomFailed {
                peer: self.peer,
                reason,
            });
        }
        let invited = state.invited.get_or_insert_with(Vec::new);
        for user in invite {
            if !invited.contains(user) {
                invited.push(user.clone());
            }
        }
        Ok(())
    }
}

/// Conversations kept in a map keyed by peer reference.
#[derive(Debug, Clone, Default)]
pub struct MemoryConversationRegistry {
    conversations: Arc<Mutex<HashMap<PeerReference, Arc<MemoryConversation>>>>,
}

impl MemoryConversationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a conversation up without creating it.
    pub fn get(&self, peer: PeerReference) -> Option<Arc<MemoryConversation>> {
        self.conversations.lock().unwrap().get(&peer).cloned()
    }

    /// Make room creation for `peer` fail with `reason`.
    pub fn fail_rooms_for(&self, peer: PeerReference, reason: &str) {
        let conversation = self.entry(peer);
        conversation.state.lock().unwrap().room_error = Some(reason.to_string());
    }

    /// Number of conversations known.
    pub fn len(&self) -> usize {
        self.conversations.lock().unwrap().len()
    }

    /// True if no conversation was created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, peer: PeerReference) -> Arc<MemoryConversation> {
        let mut conversations = self.conversations.lock().unwrap();
        Arc::clone(
            conversations
                .entry(peer)
                .or_insert_with(|| Arc::new(MemoryConversation::new(peer))),
        )
    }
}

#[async_trait]
impl ConversationRegistry for MemoryConversationRegistry {
    async fn get_or_create_by_peer(
        &self,
        peer: PeerReference,
    ) -> Result<Arc<dyn Conversation>, RegistryError> {
        let conversation: Arc<dyn Conversation> = self.entry(peer);
        Ok(conversation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MockSession;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let registry = MemoryContactRegistry::new();
        let a = registry.get_or_create(RemoteId::new(1)).await.unwrap();
        let b = registry.get_or_create(RemoteId::new(1)).await.unwrap();
        assert_eq!(a, b);
        assert!(registry.get(RemoteId::new(1)).is_some());
    }

    #[tokio::test]
    async fn update_stores_refreshed_contact() {
        let registry = MemoryContactRegistry::new();
        let session = MockSession::new();
        let mut contact = registry.get_or_create(RemoteId::new(1)).await.unwrap();

        let changed = registry
            .update_from_remote(
                &session,
                &mut contact,
                &RemoteUser::new(1).with_username("alice"),
                true,
            )
            .await
            .unwrap();

        assert!(changed);
        assert_eq!(
            registry.get(RemoteId::new(1)).unwrap().username.as_deref(),
            Some("alice")
        );
        assert_eq!(registry.update_count(), 1);
    }

    #[tokio::test]
    async fn forced_update_failure() {
        let registry = MemoryContactRegistry::new();
        registry.fail_updates_for(RemoteId::new(2));
        let session = MockSession::new();
        let mut contact = Contact::new(RemoteId::new(2));

        let result = registry
            .update_from_remote(&session, &mut contact, &RemoteUser::new(2), true)
            .await;
        assert!(matches!(result, Err(RegistryError::UpdateFailed { .. })));
    }

    #[tokio::test]
    async fn conversation_reports_title_changes() {
        let registry = MemoryConversationRegistry::new();
        let session = MockSession::new();
        let peer = PeerReference::chat(10);
        let conversation = registry.get_or_create_by_peer(peer).await.unwrap();

        let dialog = RemoteDialog::new(peer, "Tea Party");
        assert!(conversation.update_info(&session, &dialog).await.unwrap());
        assert!(!conversation.update_info(&session, &dialog).await.unwrap());
        assert_eq!(
            registry.get(peer).unwrap().title().as_deref(),
            Some("Tea Party")
        );
    }

    #[tokio::test]
    async fn materialize_invites_once() {
        let registry = MemoryConversationRegistry::new();
        let session = MockSession::new();
        let peer = PeerReference::user(3);
        let conversation = registry.get_or_create_by_peer(peer).await.unwrap();
        let alice = UserId::new("@alice:example.org");

        conversation
            .materialize_room(&session, std::slice::from_ref(&alice))
            .await
            .unwrap();
        conversation
            .materialize_room(&session, std::slice::from_ref(&alice))
            .await
            .unwrap();

        let memory = registry.get(peer).unwrap();
        assert_eq!(memory.invited(), Some(vec![alice]));
        assert_eq!(memory.room_attempts(), 2);
    }

    #[tokio::test]
    async fn forced_room_failure() {
        let registry = MemoryConversationRegistry::new();
        let session = MockSession::new();
        let peer = PeerReference::channel(4);
        registry.fail_rooms_for(peer, "homeserver unavailable");

        let conversation = registry.get_or_create_by_peer(peer).await.unwrap();
        let result = conversation.materialize_room(&session, &[]).await;

        assert!(matches!(result, Err(RegistryError::RoomFailed { .. })));
        assert!(registry.get(peer).unwrap().invited().is_none());
    }
}
