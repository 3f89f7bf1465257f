//! Per-conversation outcomes of a dialog sync.
//!
//! Dialog sync keeps going when materializing one room fails. Instead of
//! only logging those failures, each conversation's outcome is recorded
//! here so callers can inspect the batch afterwards.

use portal_bridge_types::PeerReference;

/// Why a conversation was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The account is banned or kicked from the conversation.
    Forbidden,
    /// The conversation no longer exists remotely.
    Deactivated,
}

/// Result of the optional room-materialization step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomOutcome {
    /// Room creation was not requested for this sync.
    NotRequested,
    /// The room exists and the user was invited.
    Materialized,
    /// Materialization failed; the sync continued.
    Failed {
        /// Human-readable failure.
        error: String,
    },
}

/// What happened to one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    /// Not mirrored at all.
    Skipped(SkipReason),
    /// Info refreshed from the remote snapshot.
    Synced {
        /// The tracked info changed.
        changed: bool,
        /// Room step result.
        room: RoomOutcome,
    },
}

/// One conversation's entry in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogSyncItem {
    /// Conversation the outcome belongs to.
    pub peer: PeerReference,
    /// Outcome.
    pub outcome: DialogOutcome,
}

/// Outcome of a whole dialog sync, in remote list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogSyncReport {
    items: Vec<DialogSyncItem>,
}

impl DialogSyncReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skipped conversation.
    pub fn skipped(&mut self, peer: PeerReference, reason: SkipReason) {
        self.items.push(DialogSyncItem {
            peer,
            outcome: DialogOutcome::Skipped(reason),
        });
    }

    /// Record a synced conversation.
    pub fn synced(&mut self, peer: PeerReference, changed: bool, room: RoomOutcome) {
        self.items.push(DialogSyncItem {
            peer,
            outcome: DialogOutcome::Synced { changed, room },
        });
    }

    /// Whether any conversation's tracked info changed.
    ///
    /// Room failures never influence this.
    pub fn changed(&self) -> bool {
        self.items.iter().any(|item| {
            matches!(
                item.outcome,
                DialogOutcome::Synced { changed: true, .. }
            )
        })
    }

    /// All recorded outcomes.
    pub fn items(&self) -> &[DialogSyncItem] {
        &self.items
    }

    /// Conversations whose room step failed, with the error.
    pub fn room_failures(&self) -> Vec<(PeerReference, &str)> {
        self.items
            .iter()
            .filter_map(|item| match &item.outcome {
                DialogOutcome::Synced {
                    room: RoomOutcome::Failed { error },
                    ..
                } => Some((item.peer, error.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Number of conversations that were skipped.
    pub fn skipped_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, DialogOutcome::Skipped(_)))
            .count()
    }

    /// Number of conversations that were synced.
    pub fn synced_count(&self) -> usize {
        self.items.len() - self.skipped_count()
    }
}
