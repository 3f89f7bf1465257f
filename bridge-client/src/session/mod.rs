//! Remote session abstraction.
//!
//! A [`RemoteSession`] is one (possibly unauthenticated) connection to the
//! remote network for one bridge user. It exposes a generic request
//! primitive ([`RemoteSession::call`]) plus the login operations.
//!
//! Every failure at this boundary is a [`SessionError`] carrying a
//! canonical message; the bridge user turns it into
//! `BridgeError::RemoteProtocol` without inspecting it further.
//!
//! # Example
//!
//! ```ignore
//! let session = MockSession::new();
//! session.queue_response(RemoteResponse::Dialogs(vec![]));
//! let response = session.call(RemoteRequest::GetDialogs).await?;
//! ```

mod mock;

pub use mock::{MockSession, MockSessionFactory, RecordedCall};

use async_trait::async_trait;
use portal_bridge_core::{ContactsHash, PhoneStatus};
use portal_bridge_types::{RemoteDialog, RemoteUser, SessionSnapshot, UserId};
use thiserror::Error;

/// Failure reported by the remote session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The remote side answered with an error.
    #[error("{method} failed: {message}")]
    Rpc {
        /// Remote method that failed.
        method: String,
        /// Canonical error message.
        message: String,
    },

    /// The session is not connected.
    #[error("not connected")]
    NotConnected,

    /// The operation needs an authenticated session.
    #[error("not authorized")]
    Unauthorized,
}

impl SessionError {
    /// Build an RPC error.
    pub fn rpc(method: &str, message: impl Into<String>) -> Self {
        Self::Rpc {
            method: method.to_string(),
            message: message.into(),
        }
    }
}

/// Requests sent through the generic call primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRequest {
    /// Fetch the contact list unless it matches `hash`.
    GetContacts {
        /// Hash of the locally known contact ids.
        hash: ContactsHash,
    },
    /// Fetch the conversation list.
    GetDialogs,
    /// Server-side contact search.
    SearchContacts {
        /// Search text.
        query: String,
        /// Maximum number of results.
        limit: usize,
    },
}

impl RemoteRequest {
    /// Method name for logs and errors.
    pub fn method(&self) -> &'static str {
        match self {
            RemoteRequest::GetContacts { .. } => "contacts.getContacts",
            RemoteRequest::GetDialogs => "messages.getDialogs",
            RemoteRequest::SearchContacts { .. } => "contacts.search",
        }
    }
}

/// Responses to [`RemoteRequest`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteResponse {
    /// The contact list matches the presented hash.
    ContactsNotModified,
    /// Full contact list in remote order.
    Contacts(Vec<RemoteUser>),
    /// Conversation list in remote order.
    Dialogs(Vec<RemoteDialog>),
    /// Search results in remote ranking order.
    Found(Vec<RemoteUser>),
}

/// Code delivery confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCode {
    /// Handshake hash required to redeem the code.
    pub phone_code_hash: String,
}

/// Result of redeeming a login code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The session is now authenticated as this identity.
    Authorized(RemoteUser),
    /// The account has two-factor protection; a password is needed.
    PasswordRequired,
}

/// One connection to the remote network for one bridge user.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Generic remote call.
    async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse, SessionError>;

    /// Ask whether a phone number belongs to a usable account.
    async fn check_phone(&self, phone_number: &str) -> Result<PhoneStatus, SessionError>;

    /// Ask the remote side to send a login code.
    async fn send_code(&self, phone_number: &str) -> Result<SentCode, SessionError>;

    /// Redeem a login code.
    async fn sign_in(
        &self,
        phone_number: &str,
        code: &str,
        phone_code_hash: &str,
    ) -> Result<SignInOutcome, SessionError>;

    /// Answer a two-factor challenge.
    async fn check_password(&self, password_hash: &str) -> Result<RemoteUser, SessionError>;

    /// Invalidate the session remotely.
    async fn log_out(&self) -> Result<(), SessionError>;

    /// Identity the session is authenticated as, if any.
    async fn authorized_identity(&self) -> Option<RemoteUser>;

    /// Serialize the session so it can be rebuilt later.
    fn to_snapshot(&self) -> SessionSnapshot;
}

/// Builds sessions for bridge users.
pub trait SessionFactory: Send + Sync {
    /// Concrete session type produced.
    type Session: RemoteSession + 'static;

    /// Build a session for `owner`, restoring `snapshot` if present.
    fn from_snapshot(&self, owner: &UserId, snapshot: Option<&SessionSnapshot>) -> Self::Session;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_error_message_is_canonical() {
        let err = SessionError::rpc("auth.sendCode", "PHONE_NUMBER_FLOOD");
        assert_eq!(err.to_string(), "auth.sendCode failed: PHONE_NUMBER_FLOOD");
    }

    #[test]
    fn request_method_names() {
        assert_eq!(RemoteRequest::GetDialogs.method(), "messages.getDialogs");
        assert_eq!(
            RemoteRequest::GetContacts {
                hash: ContactsHash::default()
            }
            .method(),
            "contacts.getContacts"
        );
        assert_eq!(
            RemoteRequest::SearchContacts {
                query: "a".into(),
                limit: 1
            }
            .method(),
            "contacts.search"
        );
    }

    #[test]
    fn session_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SessionError>();
    }
}
