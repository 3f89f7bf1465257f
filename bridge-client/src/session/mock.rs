//! Mock remote session for testing.
//!
//! Allows queueing call responses, scripting the login flow, forcing
//! failures and inspecting every call that was made.

use super::{
    RemoteRequest, RemoteResponse, RemoteSession, SentCode, SessionError, SessionFactory,
    SignInOutcome,
};
use async_trait::async_trait;
use portal_bridge_core::PhoneStatus;
use portal_bridge_types::{RemoteUser, SessionSnapshot, UserId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// Generic call.
    Call(RemoteRequest),
    /// Phone check.
    CheckPhone(String),
    /// Code request.
    SendCode(String),
    /// Code redemption.
    SignIn {
        /// Phone number.
        phone_number: String,
        /// Code submitted.
        code: String,
        /// Handshake hash presented.
        phone_code_hash: String,
    },
    /// Password check.
    CheckPassword(String),
    /// Remote logout.
    LogOut,
}

/// Mock remote session.
///
/// Clones share state, so a test can keep one handle while the bridge user
/// owns another.
#[derive(Debug, Default)]
pub struct MockSession {
    inner: Arc<Mutex<MockSessionInner>>,
}

#[derive(Debug)]
struct MockSessionInner {
    calls: Vec<RecordedCall>,
    responses: VecDeque<RemoteResponse>,
    phone_status: PhoneStatus,
    phone_code_hash: String,
    login_code: String,
    two_factor_password: Option<String>,
    identity: RemoteUser,
    authorized: Option<RemoteUser>,
    fail_next_call: Option<String>,
    fail_next_auth: Option<String>,
}

impl Default for MockSessionInner {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            responses: VecDeque::new(),
            phone_status: PhoneStatus::Valid,
            phone_code_hash: "mock-code-hash".to_string(),
            login_code: "12345".to_string(),
            two_factor_password: None,
            identity: RemoteUser::new(1000).with_username("bridgeuser"),
            authorized: None,
            fail_next_call: None,
            fail_next_auth: None,
        }
    }
}

impl MockSession {
    /// Create a new, unauthenticated mock session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock session that is already logged in as `identity`.
    pub fn authorized_as(identity: RemoteUser) -> Self {
        let session = Self::new();
        {
            let mut inner = session.inner.lock().unwrap();
            inner.identity = identity.clone();
            inner.authorized = Some(identity);
        }
        session
    }

    /// Queue a response for the next `call()`.
    pub fn queue_response(&self, response: RemoteResponse) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.push_back(response);
    }

    /// Set the result of `check_phone()`.
    pub fn set_phone_status(&self, status: PhoneStatus) {
        let mut inner = self.inner.lock().unwrap();
        inner.phone_status = status;
    }

    /// Set the code `sign_in()` accepts.
    pub fn set_login_code(&self, code: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.login_code = code.to_string();
    }

    /// Require a second factor after the code.
    pub fn set_two_factor_password(&self, password_hash: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.two_factor_password = Some(password_hash.to_string());
    }

    /// Identity the session signs in as.
    pub fn set_identity(&self, identity: RemoteUser) {
        let mut inner = self.inner.lock().unwrap();
        inner.identity = identity;
    }

    /// Handshake hash handed out by `send_code()`.
    pub fn phone_code_hash(&self) -> String {
        let inner = self.inner.lock().unwrap();
        inner.phone_code_hash.clone()
    }

    /// Cause the next `call()` to fail with the given message.
    pub fn fail_next_call(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_call = Some(error.to_string());
    }

    /// Cause the next login operation to fail with the given message.
    pub fn fail_next_auth(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_auth = Some(error.to_string());
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        let inner = self.inner.lock().unwrap();
        inner.calls.clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.calls.len()
    }

    /// Responses queued but not consumed.
    pub fn pending_responses(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.responses.len()
    }

    fn record(&self, call: RecordedCall) -> std::sync::MutexGuard<'_, MockSessionInner> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        inner
    }
}

impl Clone for MockSession {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl RemoteSession for MockSession {
    async fn call(&self, request: RemoteRequest) -> Result<RemoteResponse, SessionError> {
        let method = request.method();
        let mut inner = self.record(RecordedCall::Call(request));

        // Check for forced failure
        if let Some(error) = inner.fail_next_call.take() {
            return Err(SessionError::rpc(method, error));
        }

        inner
            .responses
            .pop_front()
            .ok_or_else(|| SessionError::rpc(method, "no response queued"))
    }

    async fn check_phone(&self, phone_number: &str) -> Result<PhoneStatus, SessionError> {
        let mut inner = self.record(RecordedCall::CheckPhone(phone_number.to_string()));
        if let Some(error) = inner.fail_next_auth.take() {
            return Err(SessionError::rpc("auth.checkPhone", error));
        }
        Ok(inner.phone_status)
    }

    async fn send_code(&self, phone_number: &str) -> Result<SentCode, SessionError> {
        let mut inner = self.record(RecordedCall::SendCode(phone_number.to_string()));
        if let Some(error) = inner.fail_next_auth.take() {
            return Err(SessionError::rpc("auth.sendCode", error));
        }
        Ok(SentCode {
            phone_code_hash: inner.phone_code_hash.clone(),
        })
    }

    async fn sign_in(
        &self,
        phone_number: &str,
        code: &str,
        phone_code_hash: &str,
    ) -> Result<SignInOutcome, SessionError> {
        let mut inner = self.record(RecordedCall::SignIn {
            phone_number: phone_number.to_string(),
            code: code.to_string(),
            phone_code_hash: phone_code_hash.to_string(),
        });
        if let Some(error) = inner.fail_next_auth.take() {
            return Err(SessionError::rpc("auth.signIn", error));
        }
        if phone_code_hash != inner.phone_code_hash {
            return Err(SessionError::rpc("auth.signIn", "PHONE_CODE_EXPIRED"));
        }
        if code != inner.login_code {
            return Err(SessionError::rpc("auth.signIn", "PHONE_CODE_INVALID"));
        }
        if inner.two_factor_password.is_some() {
            return Ok(SignInOutcome::PasswordRequired);
        }
        let identity = inner.identity.clone();
        inner.authorized = Some(identity.clone());
        Ok(SignInOutcome::Authorized(identity))
    }

    async fn check_password(&self, password_hash: &str) -> Result<RemoteUser, SessionError> {
        let mut inner = self.record(RecordedCall::CheckPassword(password_hash.to_string()));
        if let Some(error) = inner.fail_next_auth.take() {
            return Err(SessionError::rpc("auth.checkPassword", error));
        }
        match inner.two_factor_password.as_deref() {
            Some(expected) if expected == password_hash => {
                let identity = inner.identity.clone();
                inner.authorized = Some(identity.clone());
                Ok(identity)
            }
            Some(_) => Err(SessionError::rpc("auth.checkPassword", "PASSWORD_HASH_INVALID")),
            None => Err(SessionError::rpc("auth.checkPassword", "PASSWORD_NOT_REQUESTED")),
        }
    }

    async fn log_out(&self) -> Result<(), SessionError> {
        let mut inner = self.record(RecordedCall::LogOut);
        if let Some(error) = inner.fail_next_auth.take() {
            return Err(SessionError::rpc("auth.logOut", error));
        }
        inner.authorized = None;
        Ok(())
    }

    async fn authorized_identity(&self) -> Option<RemoteUser> {
        let inner = self.inner.lock().unwrap();
        inner.authorized.clone()
    }

    fn to_snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().unwrap();
        let state = match &inner.authorized {
            Some(identity) => format!("mock:{}", identity.id),
            None => "mock:anonymous".to_string(),
        };
        SessionSnapshot::new(state.into_bytes())
    }
}

/// Factory handing out clones of one [`MockSession`].
///
/// Records every construction so tests can check when sessions are built
/// and from which snapshot.
#[derive(Debug, Clone, Default)]
pub struct MockSessionFactory {
    session: MockSession,
    built: Arc<Mutex<Vec<(UserId, Option<SessionSnapshot>)>>>,
}

impl MockSessionFactory {
    /// Create a factory around `session`.
    pub fn new(session: MockSession) -> Self {
        Self {
            session,
            built: Arc::default(),
        }
    }

    /// The shared session handle.
    pub fn session(&self) -> &MockSession {
        &self.session
    }

    /// Every `(owner, snapshot)` a session was built for.
    pub fn built(&self) -> Vec<(UserId, Option<SessionSnapshot>)> {
        self.built.lock().unwrap().clone()
    }
}

impl SessionFactory for MockSessionFactory {
    type Session = MockSession;

    fn from_snapshot(&self, owner: &UserId, snapshot: Option<&SessionSnapshot>) -> MockSession {
        self.built
            .lock()
            .unwrap()
            .push((owner.clone(), snapshot.cloned()));
        self.session.clone()
    }
}
