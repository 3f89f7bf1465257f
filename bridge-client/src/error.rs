//! Error types for bridge-user operations.
//!
//! Lower-layer errors flatten into [`BridgeError`]. Every remote-session
//! failure becomes a single [`BridgeError::RemoteProtocol`] carrying the
//! session's message, so callers never inspect remote error shapes.

use portal_bridge_core::AuthError;
use portal_bridge_types::EntryError;
use thiserror::Error;

use crate::persistence::PersistenceError;
use crate::registry::RegistryError;
use crate::session::SessionError;

/// Errors from bridge-user operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A login was requested while already logged in.
    #[error("already authenticated")]
    AlreadyAuthenticated,

    /// The phone number has no remote account.
    #[error("phone number is not registered")]
    UnregisteredAccount,

    /// The phone number is malformed or banned.
    #[error("invalid phone number")]
    InvalidPhoneNumber,

    /// A code was submitted before a phone number was given.
    #[error("phone number not set")]
    PhoneNotSet,

    /// A code was submitted before one was requested.
    #[error("login code not requested")]
    CodeNotRequested,

    /// A password was submitted with no two-factor challenge outstanding.
    #[error("password not requested")]
    PasswordNotRequested,

    /// The remote session failed.
    #[error("remote protocol error: {0}")]
    RemoteProtocol(String),

    /// The remote session answered with the wrong kind of response.
    #[error("unexpected response to {0}")]
    UnexpectedResponse(String),

    /// Rehydration was given an entry of another kind.
    #[error("wrong entry type: expected {expected}, got {actual}")]
    WrongEntryType {
        /// Kind expected.
        expected: String,
        /// Kind found.
        actual: String,
    },

    /// A persisted entry could not be decoded.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    /// A contact or conversation registry failed.
    #[error("registry error: {0}")]
    Registry(String),

    /// Saving or loading failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<AuthError> for BridgeError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AlreadyAuthenticated => BridgeError::AlreadyAuthenticated,
            AuthError::UnregisteredAccount => BridgeError::UnregisteredAccount,
            AuthError::InvalidPhoneNumber => BridgeError::InvalidPhoneNumber,
            AuthError::PhoneNotSet => BridgeError::PhoneNotSet,
            AuthError::CodeNotRequested => BridgeError::CodeNotRequested,
            AuthError::PasswordNotRequested => BridgeError::PasswordNotRequested,
        }
    }
}

impl From<SessionError> for BridgeError {
    fn from(err: SessionError) -> Self {
        BridgeError::RemoteProtocol(err.to_string())
    }
}

impl From<RegistryError> for BridgeError {
    fn from(err: RegistryError) -> Self {
        BridgeError::Registry(err.to_string())
    }
}

impl From<PersistenceError> for BridgeError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Entry(e) => e.into(),
            PersistenceError::Storage(msg) => BridgeError::Persistence(msg),
        }
    }
}

impl From<EntryError> for BridgeError {
    fn from(err: EntryError) -> Self {
        match err {
            EntryError::WrongType { expected, actual } => {
                BridgeError::WrongEntryType { expected, actual }
            }
            other => BridgeError::InvalidEntry(other.to_string()),
        }
    }
}
