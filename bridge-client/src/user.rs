//! BridgeUser - the aggregate binding a local identity to a remote account.
//!
//! A [`BridgeUser`] owns the login state machine from `bridge-core`, a lazily
//! built [`RemoteSession`], and the cached contact list. It interprets the
//! [`AuthAction`]s the state machine returns and performs the remote calls,
//! registry lookups and saves around them.
//!
//! ```text
//! Caller → BridgeUser → RemoteSession → remote network
//!              ↓              ↓
//!         bridge-core    Contact/Conversation registries → Persistence
//! ```
//!
//! One `BridgeUser` has a single logical owner. Every operation takes
//! `&mut self` and awaits each remote call and save before touching state,
//! so operations issued in sequence complete in that sequence.
//!
//! # Example
//!
//! ```ignore
//! let mut user = BridgeUser::new(UserId::new("@alice:example.org"), ctx);
//! user.request_code("+15551234567").await?;
//! match user.submit_code("12345").await? {
//!     SignInOutcome::Authorized(_) => {}
//!     SignInOutcome::PasswordRequired => {
//!         user.submit_password(&password_hash).await?;
//!     }
//! }
//! user.post_login().await?;
//! ```

use std::sync::Arc;

use portal_bridge_core::{
    rank_contacts, AuthAction, AuthEvent, AuthState, ContactMatch, ContactsHash,
    DialogSyncReport, RoomOutcome, SearchOptions, SkipReason,
};
use portal_bridge_types::{
    Contact, RemoteId, RemoteUser, SessionSnapshot, UserEntry, UserEntryData, UserId,
};
use tracing::{debug, info, warn};

use crate::config::{BridgeConfig, SyncConfig};
use crate::error::BridgeError;
use crate::persistence::{Persistence, WhitelistPolicy};
use crate::registry::{ContactRegistry, ConversationRegistry};
use crate::session::{
    RemoteRequest, RemoteResponse, RemoteSession, SessionFactory, SignInOutcome,
};

/// Collaborators shared by every bridge user of one bridge.
pub struct BridgeContext<F: SessionFactory> {
    /// Builds remote sessions from snapshots.
    pub session_factory: F,
    /// Resolves remote ids to contacts.
    pub contacts: Arc<dyn ContactRegistry>,
    /// Resolves peer references to conversations.
    pub conversations: Arc<dyn ConversationRegistry>,
    /// Stores user entries.
    pub persistence: Arc<dyn Persistence>,
    /// Access policy consulted when a user is constructed.
    pub whitelist: Arc<dyn WhitelistPolicy>,
    /// Bridge configuration.
    pub config: BridgeConfig,
}

/// Options for [`BridgeUser::sync_dialogs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncDialogsOptions {
    /// Create the visible local room for each mirrored conversation and
    /// invite the user into it.
    pub create_rooms: bool,
}

impl Default for SyncDialogsOptions {
    fn default() -> Self {
        Self { create_rooms: true }
    }
}

impl From<&SyncConfig> for SyncDialogsOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            create_rooms: config.create_rooms,
        }
    }
}

/// A local identity bound to a remote messaging account.
pub struct BridgeUser<F: SessionFactory> {
    user_id: UserId,
    authorized: bool,
    auth: AuthState,
    command_status: Option<serde_json::Value>,
    puppet_data: Option<SessionSnapshot>,
    contacts: Vec<Contact>,
    identity: Option<RemoteUser>,
    session: Option<F::Session>,
    ctx: Arc<BridgeContext<F>>,
}

impl<F: SessionFactory> BridgeUser<F> {
    /// Create a fresh bridge user.
    ///
    /// The whitelist is consulted once here; see [`BridgeUser::is_authorized`].
    pub fn new(user_id: UserId, ctx: Arc<BridgeContext<F>>) -> Self {
        let authorized = ctx.whitelist.check(&user_id);
        if !authorized {
            debug!("{} is not whitelisted", user_id);
        }
        Self {
            user_id,
            authorized,
            auth: AuthState::new(),
            command_status: None,
            puppet_data: None,
            contacts: Vec::new(),
            identity: None,
            session: None,
            ctx,
        }
    }

    /// Rebuild a bridge user from a persisted entry.
    ///
    /// Contacts listed in the entry are resolved before this returns. When
    /// the entry carries a session snapshot the session is rebuilt
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::WrongEntryType`] for entries of another kind,
    /// or a registry error if a contact cannot be resolved.
    pub async fn from_entry(
        entry: UserEntry,
        ctx: Arc<BridgeContext<F>>,
    ) -> Result<Self, BridgeError> {
        entry.expect_user()?;
        let UserEntry { id, data, .. } = entry;

        let mut user = Self::new(id, ctx);
        user.auth = AuthState::from_parts(data.phone_number, data.phone_code_hash);
        user.puppet_data = data.puppet;
        user.set_contact_ids(&data.contact_ids).await?;

        if user.puppet_data.is_some() {
            user.ensure_session();
        }

        debug!(
            "Restored {} with {} contacts",
            user.user_id,
            user.contacts.len()
        );
        Ok(user)
    }

    /// Load the bridge user stored for `user_id`, if any.
    pub async fn load(
        user_id: &UserId,
        ctx: Arc<BridgeContext<F>>,
    ) -> Result<Option<Self>, BridgeError> {
        match ctx.persistence.load(user_id).await? {
            Some(entry) => Ok(Some(Self::from_entry(entry, ctx).await?)),
            None => Ok(None),
        }
    }

    /// Local identity.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Whether the whitelist admitted this user at construction.
    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    /// Current login state.
    pub fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    /// Cached contacts in remote order.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Remote identity of the last successful login.
    pub fn identity(&self) -> Option<&RemoteUser> {
        self.identity.as_ref()
    }

    /// Stored session snapshot.
    pub fn puppet_data(&self) -> Option<&SessionSnapshot> {
        self.puppet_data.as_ref()
    }

    /// Whether a session object is currently held.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// State slot owned by the interactive command handler.
    pub fn command_status(&self) -> Option<&serde_json::Value> {
        self.command_status.as_ref()
    }

    /// Replace the command handler's state slot.
    pub fn set_command_status(&mut self, status: Option<serde_json::Value>) {
        self.command_status = status;
    }

    /// Bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.ctx.config
    }

    /// Persisted form of this user.
    pub fn to_entry(&self) -> UserEntry {
        UserEntry::new(
            self.user_id.clone(),
            UserEntryData {
                phone_number: self.auth.phone_number().map(str::to_string),
                phone_code_hash: self.auth.phone_code_hash().map(str::to_string),
                contact_ids: self.contacts.iter().map(|contact| contact.id).collect(),
                puppet: self.puppet_data.clone(),
            },
        )
    }

    /// Persist this user.
    ///
    /// The session snapshot is refreshed from the live session first.
    pub async fn save(&mut self) -> Result<(), BridgeError> {
        if let Some(session) = &self.session {
            self.puppet_data = Some(session.to_snapshot());
        }
        self.ctx.persistence.save(&self.to_entry()).await?;
        debug!("Saved {}", self.user_id);
        Ok(())
    }

    /// The remote session, built from the stored snapshot on first use.
    pub fn ensure_session(&mut self) -> &F::Session {
        Self::session_slot(
            &mut self.session,
            &self.ctx,
            &self.user_id,
            self.puppet_data.as_ref(),
        )
    }

    // Borrows only the session field so callers can keep using the
    // registries and the contact cache while the session is in use.
    fn session_slot<'a>(
        slot: &'a mut Option<F::Session>,
        ctx: &BridgeContext<F>,
        owner: &UserId,
        snapshot: Option<&SessionSnapshot>,
    ) -> &'a F::Session {
        slot.get_or_insert_with(|| {
            debug!(
                "Building remote session for {} (snapshot: {})",
                owner,
                snapshot.is_some()
            );
            ctx.session_factory.from_snapshot(owner, snapshot)
        })
    }

    /// Feed an event to the login state machine and carry out its actions.
    async fn apply(&mut self, event: AuthEvent) -> Result<(), BridgeError> {
        let state = std::mem::take(&mut self.auth);
        let (new_state, actions) = state.on_event(event);
        self.auth = new_state;

        for action in actions {
            match action {
                AuthAction::DiscardSession => {
                    self.session = None;
                    self.puppet_data = None;
                }
                AuthAction::Persist => self.save().await?,
            }
        }
        Ok(())
    }

    /// Whether the remote session reports an authenticated identity.
    ///
    /// Never builds a session when there is nothing to rebuild it from.
    pub async fn is_logged_in(&mut self) -> bool {
        if self.session.is_none() && self.puppet_data.is_none() {
            return false;
        }
        self.ensure_session().authorized_identity().await.is_some()
    }

    /// Bring the user online.
    ///
    /// Builds the session and, if it is already authenticated, marks the
    /// user logged in and runs [`BridgeUser::post_login`] when
    /// `sync.sync_on_start` is set. Returns whether the user is logged in.
    pub async fn start(&mut self) -> Result<bool, BridgeError> {
        let identity = self.ensure_session().authorized_identity().await;
        let Some(identity) = identity else {
            debug!("{} started without a logged-in session", self.user_id);
            return Ok(false);
        };

        info!("{} is logged in as {}", self.user_id, identity.id);
        self.identity = Some(identity);
        self.apply(AuthEvent::SessionAuthorized).await?;

        if self.ctx.config.sync.sync_on_start {
            self.post_login().await?;
        }
        Ok(true)
    }

    /// Sync contacts, then dialogs with the configured room policy.
    pub async fn post_login(&mut self) -> Result<(), BridgeError> {
        self.sync_contacts().await?;
        let options = SyncDialogsOptions::from(&self.ctx.config.sync);
        self.sync_dialogs(options).await?;
        Ok(())
    }

    // ===========================================
    // Login
    // ===========================================

    /// Ask the remote side to send a login code to `phone_number`.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::AlreadyAuthenticated`] if logged in (no remote call)
    /// - [`BridgeError::UnregisteredAccount`] / [`BridgeError::InvalidPhoneNumber`]
    ///   from the phone check
    /// - [`BridgeError::RemoteProtocol`] for any remote failure
    pub async fn request_code(&mut self, phone_number: &str) -> Result<(), BridgeError> {
        self.auth.can_request_code()?;

        let session = self.ensure_session();
        let authorized = session.authorized_identity().await;
        if let Some(identity) = authorized {
            self.identity = Some(identity);
            self.apply(AuthEvent::SessionAuthorized).await?;
            return Err(BridgeError::AlreadyAuthenticated);
        }

        let status = session.check_phone(phone_number).await?;
        status.check()?;
        let sent = session.send_code(phone_number).await?;

        info!("Login code sent for {}", self.user_id);
        self.apply(AuthEvent::CodeRequested {
            phone_number: phone_number.to_string(),
            phone_code_hash: sent.phone_code_hash,
        })
        .await
    }

    /// Redeem the login code sent by [`BridgeUser::request_code`].
    ///
    /// The handshake hash is cleared and the user saved whatever the
    /// outcome. [`SignInOutcome::PasswordRequired`] means the caller must
    /// continue with [`BridgeUser::submit_password`].
    ///
    /// # Errors
    ///
    /// [`BridgeError::PhoneNotSet`] or [`BridgeError::CodeNotRequested`]
    /// before a code was requested (no remote call), otherwise
    /// [`BridgeError::RemoteProtocol`] if the remote side rejects the code.
    pub async fn submit_code(&mut self, code: &str) -> Result<SignInOutcome, BridgeError> {
        let (phone_number, phone_code_hash) = self
            .auth
            .pending_code()
            .map(|(phone, hash)| (phone.to_string(), hash.to_string()))?;

        let result = self
            .ensure_session()
            .sign_in(&phone_number, code, &phone_code_hash)
            .await;

        match result {
            Ok(SignInOutcome::Authorized(identity)) => {
                info!("{} logged in as {}", self.user_id, identity.id);
                self.identity = Some(identity.clone());
                self.apply(AuthEvent::CodeAccepted).await?;
                Ok(SignInOutcome::Authorized(identity))
            }
            Ok(SignInOutcome::PasswordRequired) => {
                debug!("{} needs a two-factor password", self.user_id);
                self.apply(AuthEvent::PasswordRequested).await?;
                Ok(SignInOutcome::PasswordRequired)
            }
            Err(e) => {
                self.apply(AuthEvent::CodeRejected).await?;
                Err(e.into())
            }
        }
    }

    /// Answer the two-factor challenge. The user is saved either way.
    ///
    /// # Errors
    ///
    /// [`BridgeError::PasswordNotRequested`] unless [`BridgeUser::submit_code`]
    /// returned [`SignInOutcome::PasswordRequired`] (no remote call), otherwise
    /// [`BridgeError::RemoteProtocol`] if the remote side rejects the password.
    pub async fn submit_password(&mut self, password_hash: &str) -> Result<RemoteUser, BridgeError> {
        self.auth.pending_password()?;

        let result = self.ensure_session().check_password(password_hash).await;

        match result {
            Ok(identity) => {
                info!("{} logged in as {}", self.user_id, identity.id);
                self.identity = Some(identity.clone());
                self.apply(AuthEvent::PasswordAccepted).await?;
                Ok(identity)
            }
            Err(e) => {
                self.apply(AuthEvent::PasswordRejected).await?;
                Err(e.into())
            }
        }
    }

    /// Log out of the remote account.
    ///
    /// Drops the session and its snapshot and saves the cleared state. Safe
    /// to call when never logged in. A remote failure is logged and does not
    /// stop the local logout. Mirrored rooms are left alone.
    pub async fn log_out(&mut self) -> Result<(), BridgeError> {
        if self.session.is_some() || self.puppet_data.is_some() {
            let result = self.ensure_session().log_out().await;
            if let Err(e) = result {
                warn!("Remote logout for {} failed: {}", self.user_id, e);
            }
        }

        info!("{} logged out", self.user_id);
        self.apply(AuthEvent::LoggedOut).await
    }

    // ===========================================
    // Contacts
    // ===========================================

    /// Replace the contact cache with the contacts for `ids`, in order.
    pub async fn set_contact_ids(&mut self, ids: &[RemoteId]) -> Result<(), BridgeError> {
        let mut contacts = Vec::with_capacity(ids.len());
        for id in ids {
            contacts.push(self.ctx.contacts.get_or_create(*id).await?);
        }
        self.contacts = contacts;
        Ok(())
    }

    /// Refresh the contact cache from the remote contact list.
    ///
    /// Presents the hash of the cached ids so the remote side can answer
    /// "not modified". Returns `false` in that case, leaving the cache
    /// untouched. Otherwise every contact is overwritten from the fresh
    /// data, the cache is replaced in remote order, the user is saved and
    /// `true` is returned. Any contact failure aborts without committing.
    pub async fn sync_contacts(&mut self) -> Result<bool, BridgeError> {
        let hash = ContactsHash::of_ids(self.contacts.iter().map(|contact| &contact.id));
        let session = Self::session_slot(
            &mut self.session,
            &self.ctx,
            &self.user_id,
            self.puppet_data.as_ref(),
        );

        let request = RemoteRequest::GetContacts { hash };
        let method = request.method();
        let remote = match session.call(request).await? {
            RemoteResponse::ContactsNotModified => {
                debug!("Contacts of {} not modified", self.user_id);
                return Ok(false);
            }
            RemoteResponse::Contacts(users) => users,
            _ => return Err(BridgeError::UnexpectedResponse(method.to_string())),
        };

        let mut contacts = Vec::with_capacity(remote.len());
        for info in &remote {
            let mut contact = self.ctx.contacts.get_or_create(info.id).await?;
            self.ctx
                .contacts
                .update_from_remote(session, &mut contact, info, true)
                .await?;
            contacts.push(contact);
        }

        info!("Synced {} contacts for {}", contacts.len(), self.user_id);
        self.contacts = contacts;
        self.save().await?;
        Ok(true)
    }

    // ===========================================
    // Dialogs
    // ===========================================

    /// Mirror the remote conversation list.
    ///
    /// Forbidden and deactivated conversations are skipped. Every other
    /// conversation is resolved and refreshed; [`DialogSyncReport::changed`]
    /// tells whether any tracked info changed. When `create_rooms` is set the
    /// local room is materialized too. A room failure is logged, recorded in
    /// the report, and the sync moves on; it never affects `changed`.
    pub async fn sync_dialogs(
        &mut self,
        options: SyncDialogsOptions,
    ) -> Result<DialogSyncReport, BridgeError> {
        let session = Self::session_slot(
            &mut self.session,
            &self.ctx,
            &self.user_id,
            self.puppet_data.as_ref(),
        );

        let request = RemoteRequest::GetDialogs;
        let method = request.method();
        let dialogs = match session.call(request).await? {
            RemoteResponse::Dialogs(dialogs) => dialogs,
            _ => return Err(BridgeError::UnexpectedResponse(method.to_string())),
        };

        let mut report = DialogSyncReport::new();
        for dialog in &dialogs {
            if !dialog.is_mirrorable() {
                let reason = if dialog.forbidden {
                    SkipReason::Forbidden
                } else {
                    SkipReason::Deactivated
                };
                debug!("Skipping dialog {} ({:?})", dialog.peer, reason);
                report.skipped(dialog.peer, reason);
                continue;
            }

            let conversation = self
                .ctx
                .conversations
                .get_or_create_by_peer(dialog.peer)
                .await?;
            let changed = conversation.update_info(session, dialog).await?;

            let room = if options.create_rooms {
                let invite = std::slice::from_ref(&self.user_id);
                match conversation.materialize_room(session, invite).await {
                    Ok(()) => RoomOutcome::Materialized,
                    Err(e) => {
                        warn!("Failed to create room for {}: {}", dialog.peer, e);
                        RoomOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                }
            } else {
                RoomOutcome::NotRequested
            };

            report.synced(dialog.peer, changed, room);
        }

        info!(
            "Synced {} dialogs for {} ({} skipped, {} room failures)",
            report.synced_count(),
            self.user_id,
            report.skipped_count(),
            report.room_failures().len()
        );
        Ok(report)
    }

    // ===========================================
    // Search
    // ===========================================

    /// Rank cached contacts against `query`.
    pub fn search_contacts(&self, query: &str, options: SearchOptions) -> Vec<ContactMatch> {
        rank_contacts(query, &self.contacts, options)
    }

    /// Search contacts on the remote side.
    ///
    /// Results keep the remote ranking. Each contact is resolved and merged
    /// with the returned profile. Without `max_results` the limit is
    /// `search.remote_max_results`.
    pub async fn search_remote(
        &mut self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<Contact>, BridgeError> {
        let limit = max_results.unwrap_or(self.ctx.config.search.remote_max_results);
        let session = Self::session_slot(
            &mut self.session,
            &self.ctx,
            &self.user_id,
            self.puppet_data.as_ref(),
        );

        let request = RemoteRequest::SearchContacts {
            query: query.to_string(),
            limit,
        };
        let method = request.method();
        let found = match session.call(request).await? {
            RemoteResponse::Found(users) => users,
            _ => return Err(BridgeError::UnexpectedResponse(method.to_string())),
        };

        let mut results = Vec::with_capacity(found.len());
        for info in &found {
            let mut contact = self.ctx.contacts.get_or_create(info.id).await?;
            self.ctx
                .contacts
                .update_from_remote(session, &mut contact, info, false)
                .await?;
            results.push(contact);
        }
        Ok(results)
    }
}
