//! # Credentials
//!
//! The identity tuple a requester holds, or wishes to hold, and the set of
//! fields a transition request changes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// User and group identity of a process.
///
/// Holds the effective, real and saved user ids, the effective, real and
/// saved primary group ids, and the supplementary group list. The
/// supplementary list is always sorted ascending and free of duplicates,
/// which the grant evaluator relies on for its merge scans.
///
/// # Example
///
/// ```
/// use credgate_rules::Credential;
///
/// let cred = Credential::new(1001, 1001).with_groups([20, 5, 20]);
/// assert_eq!(cred.groups(), &[5, 20]);
/// assert!(cred.is_group_member(1001));
/// assert!(cred.is_group_member(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawCredential")]
pub struct Credential {
    /// Effective user id.
    pub uid: u32,
    /// Real user id.
    pub ruid: u32,
    /// Saved user id.
    pub svuid: u32,
    /// Effective group id.
    pub gid: u32,
    /// Real group id.
    pub rgid: u32,
    /// Saved group id.
    pub svgid: u32,
    /// Supplementary groups, sorted and de-duplicated.
    groups: Vec<u32>,
}

/// Wire form of [`Credential`]; groups may arrive unsorted.
#[derive(Deserialize)]
struct RawCredential {
    uid: u32,
    ruid: u32,
    svuid: u32,
    gid: u32,
    rgid: u32,
    svgid: u32,
    #[serde(default)]
    groups: Vec<u32>,
}

impl From<RawCredential> for Credential {
    fn from(raw: RawCredential) -> Self {
        Credential::new(raw.uid, raw.gid)
            .with_uids(raw.uid, raw.ruid, raw.svuid)
            .with_gids(raw.gid, raw.rgid, raw.svgid)
            .with_groups(raw.groups)
    }
}

impl Credential {
    /// Create a credential whose effective, real and saved ids all agree,
    /// with no supplementary groups.
    ///
    /// # Arguments
    ///
    /// * `uid` - User id for all three user slots
    /// * `gid` - Group id for all three primary group slots
    pub fn new(uid: u32, gid: u32) -> Self {
        Self {
            uid,
            ruid: uid,
            svuid: uid,
            gid,
            rgid: gid,
            svgid: gid,
            groups: Vec::new(),
        }
    }

    /// Set the effective, real and saved user ids.
    pub fn with_uids(mut self, uid: u32, ruid: u32, svuid: u32) -> Self {
        self.uid = uid;
        self.ruid = ruid;
        self.svuid = svuid;
        self
    }

    /// Set the effective, real and saved primary group ids.
    pub fn with_gids(mut self, gid: u32, rgid: u32, svgid: u32) -> Self {
        self.gid = gid;
        self.rgid = rgid;
        self.svgid = svgid;
        self
    }

    /// Replace the supplementary groups.
    ///
    /// # Arguments
    ///
    /// * `groups` - Group ids in any order; duplicates are dropped
    pub fn with_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        self.set_groups(groups);
        self
    }

    /// Replace the supplementary groups in place.
    pub fn set_groups<I>(&mut self, groups: I)
    where
        I: IntoIterator<Item = u32>,
    {
        let mut groups: Vec<u32> = groups.into_iter().collect();
        groups.sort_unstable();
        groups.dedup();
        self.groups = groups;
    }

    /// Supplementary groups, sorted ascending.
    pub fn groups(&self) -> &[u32] {
        &self.groups
    }

    /// The effective, real and saved user ids.
    pub fn uids(&self) -> [u32; 3] {
        [self.uid, self.ruid, self.svuid]
    }

    /// The effective, real and saved primary group ids.
    pub fn gids(&self) -> [u32; 3] {
        [self.gid, self.rgid, self.svgid]
    }

    /// Check if `gid` is one of the supplementary groups.
    pub fn has_supplementary(&self, gid: u32) -> bool {
        self.groups.binary_search(&gid).is_ok()
    }

    /// Check real membership of a group.
    ///
    /// A process is a real member of its real primary group and of each of
    /// its supplementary groups. The effective group id does not count.
    ///
    /// # Arguments
    ///
    /// * `gid` - The group to test
    ///
    /// # Returns
    ///
    /// `true` if the real group id or a supplementary group equals `gid`
    pub fn is_group_member(&self, gid: u32) -> bool {
        self.rgid == gid || self.has_supplementary(gid)
    }
}

/// A credential component a transition request may change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CredentialField {
    /// Effective user id.
    Uid,
    /// Real user id.
    Ruid,
    /// Saved user id.
    Svuid,
    /// Effective group id.
    Gid,
    /// Real group id.
    Rgid,
    /// Saved group id.
    Svgid,
    /// Supplementary group list.
    Groups,
    /// Security label. Never granted by this engine.
    Label,
}

impl CredentialField {
    /// Get the string representation of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialField::Uid => "uid",
            CredentialField::Ruid => "ruid",
            CredentialField::Svuid => "svuid",
            CredentialField::Gid => "gid",
            CredentialField::Rgid => "rgid",
            CredentialField::Svgid => "svgid",
            CredentialField::Groups => "groups",
            CredentialField::Label => "label",
        }
    }
}

impl std::fmt::Display for CredentialField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of credential fields a request changes.
///
/// # Example
///
/// ```
/// use credgate_rules::{ChangeSet, Credential, CredentialField};
///
/// let old = Credential::new(1001, 1001);
/// let new = Credential::new(1001, 1001).with_uids(1010, 1001, 1001);
///
/// let changes = ChangeSet::between(&old, &new);
/// assert!(changes.contains(CredentialField::Uid));
/// assert!(!changes.contains(CredentialField::Ruid));
/// assert_eq!(changes.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    fields: HashSet<CredentialField>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self {
            fields: HashSet::new(),
        }
    }

    /// Compute the fields that differ between two credentials.
    ///
    /// Credentials carry no label, so the result never contains
    /// [`CredentialField::Label`]; callers changing a label add it
    /// explicitly.
    pub fn between(old: &Credential, new: &Credential) -> Self {
        let pairs = [
            (CredentialField::Uid, old.uid != new.uid),
            (CredentialField::Ruid, old.ruid != new.ruid),
            (CredentialField::Svuid, old.svuid != new.svuid),
            (CredentialField::Gid, old.gid != new.gid),
            (CredentialField::Rgid, old.rgid != new.rgid),
            (CredentialField::Svgid, old.svgid != new.svgid),
            (CredentialField::Groups, old.groups != new.groups),
        ];
        pairs
            .into_iter()
            .filter_map(|(field, changed)| changed.then_some(field))
            .collect()
    }

    /// Add a field to the set.
    pub fn insert(&mut self, field: CredentialField) {
        self.fields.insert(field);
    }

    /// Check if the set contains a field.
    pub fn contains(&self, field: CredentialField) -> bool {
        self.fields.contains(&field)
    }

    /// Check if the request changes the security label.
    pub fn changes_label(&self) -> bool {
        self.contains(CredentialField::Label)
    }

    /// Get the count of changed fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over the changed fields in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = CredentialField> + '_ {
        self.fields.iter().copied()
    }
}

impl FromIterator<CredentialField> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = CredentialField>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
