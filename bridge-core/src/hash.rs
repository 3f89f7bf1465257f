//! Content hash of the cached contact id set.
//!
//! Sent with a contact-list request so the remote side can answer
//! "not modified" without transferring the list again.

use portal_bridge_types::RemoteId;
use sha2::{Digest, Sha256};
use std::fmt;

/// Hash of a contact id list as understood by the remote side.
///
/// SHA-256 of the decimal ids joined by `,`, truncated to the low 31 bits
/// of the first four digest bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContactsHash(u32);

impl ContactsHash {
    /// Hash an id list in the order given.
    pub fn of_ids<'a>(ids: impl IntoIterator<Item = &'a RemoteId>) -> Self {
        let joined = ids
            .into_iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let digest = Sha256::digest(joined.as_bytes());
        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&digest[..4]);
        Self(u32::from_be_bytes(prefix) & 0x7fff_ffff)
    }

    /// Wrap a raw hash value.
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Raw hash value.
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ContactsHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContactsHash({:08x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i64]) -> Vec<RemoteId> {
        raw.iter().copied().map(RemoteId::new).collect()
    }

    #[test]
    fn hash_is_deterministic() {
        let a = ContactsHash::of_ids(&ids(&[1, 2, 3]));
        let b = ContactsHash::of_ids(&ids(&[1, 2, 3]));
        assert_eq!(a, b);
    }

    #[test]
    fn hash_changes_with_membership() {
        let a = ContactsHash::of_ids(&ids(&[1, 2, 3]));
        let b = ContactsHash::of_ids(&ids(&[1, 2, 4]));
        assert_ne!(a, b);
    }

    #[test]
    fn separator_prevents_ambiguity() {
        let a = ContactsHash::of_ids(&ids(&[12, 3]));
        let b = ContactsHash::of_ids(&ids(&[1, 23]));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_fits_in_31_bits() {
        for set in [&[][..], &[1][..], &[i64::MAX, -5][..]] {
            assert!(ContactsHash::of_ids(&ids(set)).value() <= 0x7fff_ffff);
        }
    }
}
