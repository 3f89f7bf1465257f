//! # bridge-types
//!
//! Data types shared across the portal bridge crates.
//!
//! - [`UserId`], [`RemoteId`], [`PeerReference`] - identity and lookup keys
//! - [`Contact`] - local mirror of a remote identity
//! - [`RemoteUser`], [`RemoteDialog`], [`SessionSnapshot`] - remote snapshots
//! - [`UserEntry`] - persisted shape of a bridge user
//! - [`EntryError`] - error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod contact;
mod entry;
mod error;
mod ids;
mod remote;

pub use contact::Contact;
pub use entry::{UserEntry, UserEntryData, USER_ENTRY_TYPE};
pub use error::EntryError;
pub use ids::{PeerKind, PeerReference, RemoteId, UserId};
pub use remote::{RemoteDialog, RemoteUser, SessionSnapshot};
