//! # bridge-client
//!
//! The bridge user: binds a local identity to a remote messaging account.
//!
//! ## Features
//!
//! - **Login**: phone number, login code and optional two-factor password,
//!   driven by the pure state machine in `bridge-core`
//! - **Contact Sync**: "not modified" hash check, wholesale cache refresh
//! - **Dialog Sync**: per-conversation room failures recorded, never fatal
//! - **Search**: fuzzy ranking of cached contacts, remote search passthrough
//! - **Session Abstraction**: pluggable remote session (real, mock)
//!
//! ## Example
//!
//! ```ignore
//! use portal_bridge_client::{BridgeUser, SyncDialogsOptions};
//!
//! let mut user = BridgeUser::load(&user_id, ctx).await?.expect("stored user");
//! user.start().await?;
//!
//! let changed = user.sync_contacts().await?;
//! let report = user.sync_dialogs(SyncDialogsOptions::default()).await?;
//! for (peer, error) in report.room_failures() {
//!     eprintln!("room for {peer} failed: {error}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod persistence;
pub mod registry;
pub mod session;
pub mod user;

pub use config::{AccessConfig, BridgeConfig, ConfigError, SearchConfig, SyncConfig};
pub use error::BridgeError;
pub use persistence::{
    MemoryPersistence, Persistence, PersistenceError, Whitelist, WhitelistPolicy,
};
pub use registry::{
    ContactRegistry, Conversation, ConversationRegistry, MemoryContactRegistry,
    MemoryConversation, MemoryConversationRegistry, RegistryError,
};
pub use session::{
    MockSession, MockSessionFactory, RecordedCall, RemoteRequest, RemoteResponse,
    RemoteSession, SentCode, SessionError, SessionFactory, SignInOutcome,
};
pub use user::{BridgeContext, BridgeUser, SyncDialogsOptions};
