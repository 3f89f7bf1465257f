//! Local mirror of a remote identity.

use serde::{Deserialize, Serialize};

use crate::{RemoteId, RemoteUser};

/// Cached snapshot of one remote identity's profile.
///
/// Contacts are value-like: a sync replaces them wholesale rather than
/// patching a shared instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Remote identity id.
    pub id: RemoteId,
    /// First name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Public username, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Phone number, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl Contact {
    /// A contact with no profile data yet.
    pub fn new(id: RemoteId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// First and last name joined by a space, if either is present.
    pub fn display_name(&self) -> Option<String> {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (None, None) => None,
            (first, last) => Some(
                format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default())
                    .trim()
                    .to_string(),
            ),
        }
    }

    /// Refresh the profile from a remote snapshot.
    ///
    /// With `force_fresh` every field is overwritten, including clearing
    /// fields the remote no longer reports. Otherwise only fields present in
    /// `info` are applied. Returns whether anything changed.
    pub fn apply_remote(&mut self, info: &RemoteUser, force_fresh: bool) -> bool {
        let before = self.clone();
        if force_fresh {
            self.first_name = info.first_name.clone();
            self.last_name = info.last_name.clone();
            self.username = info.username.clone();
            self.phone_number = info.phone_number.clone();
        } else {
            merge(&mut self.first_name, &info.first_name);
            merge(&mut self.last_name, &info.last_name);
            merge(&mut self.username, &info.username);
            merge(&mut self.phone_number, &info.phone_number);
        }
        *self != before
    }
}

fn merge(field: &mut Option<String>, incoming: &Option<String>) {
    if let Some(value) = incoming {
        *field = Some(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Contact {
        let mut contact = Contact::new(RemoteId::new(1));
        contact.first_name = Some("Alice".into());
        contact.last_name = Some("Liddell".into());
        contact.username = Some("alice".into());
        contact.phone_number = Some("5551234".into());
        contact
    }

    #[test]
    fn display_name_joins_parts() {
        assert_eq!(alice().display_name().as_deref(), Some("Alice Liddell"));

        let mut only_last = Contact::new(RemoteId::new(2));
        only_last.last_name = Some("Hatter".into());
        assert_eq!(only_last.display_name().as_deref(), Some("Hatter"));

        assert!(Contact::new(RemoteId::new(3)).display_name().is_none());
    }

    #[test]
    fn forced_update_overwrites_and_clears() {
        let mut contact = alice();
        let info = RemoteUser::new(1).with_username("alice2");

        assert!(contact.apply_remote(&info, true));
        assert_eq!(contact.username.as_deref(), Some("alice2"));
        assert!(contact.first_name.is_none());
        assert!(contact.phone_number.is_none());
    }

    #[test]
    fn merge_update_keeps_missing_fields() {
        let mut contact = alice();
        let info = RemoteUser::new(1).with_username("alice2");

        assert!(contact.apply_remote(&info, false));
        assert_eq!(contact.username.as_deref(), Some("alice2"));
        assert_eq!(contact.first_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn identical_update_reports_no_change() {
        let mut contact = alice();
        let info = RemoteUser::new(1)
            .with_name("Alice", "Liddell")
            .with_username("alice")
            .with_phone("5551234");

        assert!(!contact.apply_remote(&info, true));
    }
}
