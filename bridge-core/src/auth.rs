//! Authentication state machine for linking a remote account.
//!
//! Pure and side-effect free: [`AuthState::on_event`] takes an event and
//! returns the next state plus the actions the caller must perform
//! (persisting the user, discarding the session). The remote calls
//! themselves are made by bridge-client.
//!
//! ```text
//! Unauthenticated --CodeRequested--> CodeSent --CodeAccepted--> Authenticated
//!                                       |
//!                                       +--PasswordRequested--> PasswordRequired
//!                                                                  |
//!                                        Authenticated <--PasswordAccepted
//! ```
//!
//! `LoggedOut` returns any state to `Unauthenticated` with the handshake
//! fields cleared.

use thiserror::Error;

/// Precondition failures of the login handshake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A session is already authenticated.
    #[error("already authenticated")]
    AlreadyAuthenticated,

    /// The phone number has no remote account.
    #[error("phone number is not registered")]
    UnregisteredAccount,

    /// The phone number is malformed or banned.
    #[error("invalid phone number")]
    InvalidPhoneNumber,

    /// No phone number has been supplied yet.
    #[error("phone number not set")]
    PhoneNotSet,

    /// No login code has been requested for the phone number.
    #[error("login code not requested")]
    CodeNotRequested,

    /// No two-factor challenge is outstanding.
    #[error("password not requested")]
    PasswordNotRequested,
}

/// Result of asking the remote side about a phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneStatus {
    /// Registered and usable for login.
    Valid,
    /// Malformed or banned.
    Invalid,
    /// Well-formed but no account exists.
    Unregistered,
}

impl PhoneStatus {
    /// Map the status onto the login precondition it violates, if any.
    pub fn check(self) -> Result<(), AuthError> {
        match self {
            PhoneStatus::Valid => Ok(()),
            PhoneStatus::Invalid => Err(AuthError::InvalidPhoneNumber),
            PhoneStatus::Unregistered => Err(AuthError::UnregisteredAccount),
        }
    }
}

/// Login state of one bridge user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No live login. The phone number survives a rejected code so the
    /// user can ask for a new one.
    Unauthenticated {
        /// Phone number from an earlier attempt.
        phone_number: Option<String>,
    },
    /// A login code was sent and can be redeemed.
    CodeSent {
        /// Phone number the code was sent to.
        phone_number: String,
        /// Handshake hash required to redeem the code.
        phone_code_hash: String,
    },
    /// Code accepted but the account has two-factor protection.
    PasswordRequired {
        /// Phone number being logged in.
        phone_number: String,
    },
    /// The remote session reports a fully authenticated identity.
    Authenticated,
}

impl AuthState {
    /// Create a new state machine with no login in progress.
    pub fn new() -> Self {
        Self::Unauthenticated { phone_number: None }
    }

    /// Rebuild the state from persisted handshake fields.
    pub fn from_parts(phone_number: Option<String>, phone_code_hash: Option<String>) -> Self {
        match (phone_number, phone_code_hash) {
            (Some(phone_number), Some(phone_code_hash)) => Self::CodeSent {
                phone_number,
                phone_code_hash,
            },
            (phone_number, _) => Self::Unauthenticated { phone_number },
        }
    }

    /// Process an event and return the new state plus actions to execute.
    pub fn on_event(self, event: AuthEvent) -> (Self, Vec<AuthAction>) {
        match (self, event) {
            (Self::Authenticated, AuthEvent::CodeRequested { .. }) => (Self::Authenticated, vec![]),
            (
                _,
                AuthEvent::CodeRequested {
                    phone_number,
                    phone_code_hash,
                },
            ) => (
                Self::CodeSent {
                    phone_number,
                    phone_code_hash,
                },
                vec![AuthAction::Persist],
            ),

            (Self::CodeSent { .. }, AuthEvent::CodeAccepted) => {
                (Self::Authenticated, vec![AuthAction::Persist])
            }
            (Self::CodeSent { phone_number, .. }, AuthEvent::PasswordRequested) => (
                Self::PasswordRequired { phone_number },
                vec![AuthAction::Persist],
            ),
            (Self::CodeSent { phone_number, .. }, AuthEvent::CodeRejected) => (
                Self::Unauthenticated {
                    phone_number: Some(phone_number),
                },
                vec![AuthAction::Persist],
            ),

            (Self::PasswordRequired { .. }, AuthEvent::PasswordAccepted) => {
                (Self::Authenticated, vec![AuthAction::Persist])
            }
            (state @ Self::PasswordRequired { .. }, AuthEvent::PasswordRejected) => {
                (state, vec![AuthAction::Persist])
            }

            (Self::Authenticated, AuthEvent::SessionAuthorized) => (Self::Authenticated, vec![]),
            (_, AuthEvent::SessionAuthorized) => (Self::Authenticated, vec![AuthAction::Persist]),

            (_, AuthEvent::LoggedOut) => (
                Self::new(),
                vec![AuthAction::DiscardSession, AuthAction::Persist],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check that a login code may be requested.
    pub fn can_request_code(&self) -> Result<(), AuthError> {
        match self {
            Self::Authenticated => Err(AuthError::AlreadyAuthenticated),
            _ => Ok(()),
        }
    }

    /// Phone number and handshake hash needed to redeem a code.
    pub fn pending_code(&self) -> Result<(&str, &str), AuthError> {
        match self {
            Self::CodeSent {
                phone_number,
                phone_code_hash,
            } => Ok((phone_number.as_str(), phone_code_hash.as_str())),
            Self::Unauthenticated {
                phone_number: Some(_),
            }
            | Self::PasswordRequired { .. } => Err(AuthError::CodeNotRequested),
            _ => Err(AuthError::PhoneNotSet),
        }
    }

    /// Phone number whose two-factor challenge awaits a password.
    pub fn pending_password(&self) -> Result<&str, AuthError> {
        match self {
            Self::PasswordRequired { phone_number } => Ok(phone_number.as_str()),
            _ => Err(AuthError::PasswordNotRequested),
        }
    }

    /// Phone number of the login in progress, if any.
    pub fn phone_number(&self) -> Option<&str> {
        match self {
            Self::Unauthenticated { phone_number } => phone_number.as_deref(),
            Self::CodeSent { phone_number, .. } | Self::PasswordRequired { phone_number } => {
                Some(phone_number.as_str())
            }
            Self::Authenticated => None,
        }
    }

    /// Handshake hash of the outstanding code, if any.
    pub fn phone_code_hash(&self) -> Option<&str> {
        match self {
            Self::CodeSent {
                phone_code_hash, ..
            } => Some(phone_code_hash.as_str()),
            _ => None,
        }
    }

    /// Check if fully authenticated.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Check if a second factor is awaited.
    pub fn needs_password(&self) -> bool {
        matches!(self, Self::PasswordRequired { .. })
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcomes of the remote login calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// The remote side sent a code.
    CodeRequested {
        /// Phone number the code went to.
        phone_number: String,
        /// Hash required to redeem it.
        phone_code_hash: String,
    },
    /// The code was redeemed and the session is authenticated.
    CodeAccepted,
    /// The code was redeemed but a password is also needed.
    PasswordRequested,
    /// The remote side refused the code.
    CodeRejected,
    /// The password was accepted.
    PasswordAccepted,
    /// The password was refused.
    PasswordRejected,
    /// A restored session turned out to be authenticated already.
    SessionAuthorized,
    /// The user logged out.
    LoggedOut,
}

/// Side effects the owner of an [`AuthState`] must carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    /// Save the user.
    Persist,
    /// Drop the live session and its snapshot.
    DiscardSession,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_sent() -> AuthState {
        AuthState::CodeSent {
            phone_number: "+15551234".into(),
            phone_code_hash: "hash".into(),
        }
    }

    #[test]
    fn starts_unauthenticated() {
        let state = AuthState::new();
        assert!(matches!(
            state,
            AuthState::Unauthenticated { phone_number: None }
        ));
        assert!(state.phone_number().is_none());
        assert!(state.phone_code_hash().is_none());
    }

    #[test]
    fn code_request_transitions_to_code_sent() {
        let (state, actions) = AuthState::new().on_event(AuthEvent::CodeRequested {
            phone_number: "+15551234".into(),
            phone_code_hash: "hash".into(),
        });

        assert_eq!(state, code_sent());
        assert_eq!(actions, vec![AuthAction::Persist]);
        assert_eq!(state.phone_number(), Some("+15551234"));
        assert_eq!(state.phone_code_hash(), Some("hash"));
    }

    #[test]
    fn code_request_ignored_when_authenticated() {
        let (state, actions) = AuthState::Authenticated.on_event(AuthEvent::CodeRequested {
            phone_number: "+1".into(),
            phone_code_hash: "h".into(),
        });
        assert!(state.is_authenticated());
        assert!(actions.is_empty());
    }

    #[test]
    fn accepted_code_authenticates_and_clears_handshake() {
        let (state, actions) = code_sent().on_event(AuthEvent::CodeAccepted);

        assert!(state.is_authenticated());
        assert!(state.phone_number().is_none());
        assert!(state.phone_code_hash().is_none());
        assert!(actions.contains(&AuthAction::Persist));
    }

    #[test]
    fn two_factor_branch() {
        let (state, _) = code_sent().on_event(AuthEvent::PasswordRequested);
        assert!(state.needs_password());
        assert!(state.phone_code_hash().is_none());
        assert_eq!(state.phone_number(), Some("+15551234"));

        let (state, actions) = state.on_event(AuthEvent::PasswordRejected);
        assert!(state.needs_password());
        assert_eq!(actions, vec![AuthAction::Persist]);

        let (state, actions) = state.on_event(AuthEvent::PasswordAccepted);
        assert!(state.is_authenticated());
        assert_eq!(actions, vec![AuthAction::Persist]);
    }

    #[test]
    fn rejected_code_keeps_phone_but_drops_hash() {
        let (state, actions) = code_sent().on_event(AuthEvent::CodeRejected);

        assert_eq!(state.phone_number(), Some("+15551234"));
        assert!(state.phone_code_hash().is_none());
        assert_eq!(state.pending_code(), Err(AuthError::CodeNotRequested));
        assert_eq!(actions, vec![AuthAction::Persist]);
    }

    #[test]
    fn logout_from_any_state_resets() {
        for state in [
            AuthState::new(),
            code_sent(),
            AuthState::PasswordRequired {
                phone_number: "+1".into(),
            },
            AuthState::Authenticated,
        ] {
            let (next, actions) = state.on_event(AuthEvent::LoggedOut);
            assert_eq!(next, AuthState::new());
            assert_eq!(
                actions,
                vec![AuthAction::DiscardSession, AuthAction::Persist]
            );
        }
    }

    #[test]
    fn restored_session_authorizes() {
        let (state, actions) = AuthState::new().on_event(AuthEvent::SessionAuthorized);
        assert!(state.is_authenticated());
        assert_eq!(actions, vec![AuthAction::Persist]);

        let (_, actions) = state.on_event(AuthEvent::SessionAuthorized);
        assert!(actions.is_empty());
    }

    #[test]
    fn invalid_transitions_are_ignored() {
        let (state, actions) = AuthState::new().on_event(AuthEvent::CodeAccepted);
        assert_eq!(state, AuthState::new());
        assert!(actions.is_empty());
    }

    #[test]
    fn pending_code_preconditions() {
        assert_eq!(AuthState::new().pending_code(), Err(AuthError::PhoneNotSet));
        assert_eq!(
            AuthState::Authenticated.pending_code(),
            Err(AuthError::PhoneNotSet)
        );
        assert_eq!(
            AuthState::PasswordRequired {
                phone_number: "+1".into()
            }
            .pending_code(),
            Err(AuthError::CodeNotRequested)
        );
        assert_eq!(code_sent().pending_code(), Ok(("+15551234", "hash")));
    }

    #[test]
    fn pending_password_only_after_challenge() {
        assert_eq!(
            AuthState::new().pending_password(),
            Err(AuthError::PasswordNotRequested)
        );
        assert_eq!(
            code_sent().pending_password(),
            Err(AuthError::PasswordNotRequested)
        );
        assert_eq!(
            AuthState::Authenticated.pending_password(),
            Err(AuthError::PasswordNotRequested)
        );
        assert_eq!(
            AuthState::PasswordRequired {
                phone_number: "+1".into()
            }
            .pending_password(),
            Ok("+1")
        );
    }

    #[test]
    fn password_events_need_a_challenge() {
        for state in [AuthState::new(), code_sent(), AuthState::Authenticated] {
            let (after, actions) = state.clone().on_event(AuthEvent::PasswordAccepted);
            assert_eq!(after, state);
            assert!(actions.is_empty());

            let (after, actions) = state.clone().on_event(AuthEvent::PasswordRejected);
            assert_eq!(after, state);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn can_request_code_unless_authenticated() {
        assert!(AuthState::new().can_request_code().is_ok());
        assert!(code_sent().can_request_code().is_ok());
        assert_eq!(
            AuthState::Authenticated.can_request_code(),
            Err(AuthError::AlreadyAuthenticated)
        );
    }

    #[test]
    fn from_parts_restores_handshake() {
        assert_eq!(
            AuthState::from_parts(Some("+15551234".into()), Some("hash".into())),
            code_sent()
        );
        assert_eq!(
            AuthState::from_parts(Some("+1".into()), None),
            AuthState::Unauthenticated {
                phone_number: Some("+1".into())
            }
        );
        assert_eq!(AuthState::from_parts(None, Some("orphan".into())), AuthState::new());
    }

    #[test]
    fn phone_status_classification() {
        assert!(PhoneStatus::Valid.check().is_ok());
        assert_eq!(
            PhoneStatus::Invalid.check(),
            Err(AuthError::InvalidPhoneNumber)
        );
        assert_eq!(
            PhoneStatus::Unregistered.check(),
            Err(AuthError::UnregisteredAccount)
        );
    }
}
