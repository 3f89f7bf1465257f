//! # bridge-core
//!
//! Pure logic for the portal bridge user core (no I/O, instant tests).
//!
//! Everything here takes input and produces output without side effects:
//! - [`auth`] - login state machine producing actions for the caller
//! - [`hash`] - "not modified" hash of the cached contact set
//! - [`search`] - fuzzy ranking of cached contacts
//! - [`report`] - per-conversation outcomes of a dialog sync
//!
//! Remote calls and persistence happen in `bridge-client`, which interprets
//! what these modules return.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod hash;
pub mod report;
pub mod search;

pub use auth::{AuthAction, AuthError, AuthEvent, AuthState, PhoneStatus};
pub use hash::ContactsHash;
pub use report::{DialogOutcome, DialogSyncItem, DialogSyncReport, RoomOutcome, SkipReason};
pub use search::{
    contact_similarity, rank_contacts, similarity, ContactMatch, SearchOptions,
    DEFAULT_MAX_RESULTS, DEFAULT_MIN_SIMILARITY,
};
