//! # Rules
//!
//! Compiled rules and the immutable rule sets that hold them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::flags::{IdKind, Supplementary, TargetFlags};
use crate::grant::{self, Decision};

/// Size of the rule text buffer. Accepted text is strictly shorter.
pub const MAX_LEN: usize = 1024;

/// One explicit target id with its qualifiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct IdSpec {
    /// The target id.
    pub id: u32,
    /// Qualifiers for this id.
    pub flags: TargetFlags,
}

/// A compiled rule.
///
/// A rule applies to a requester whose real user id equals `from_id`
/// (`from_kind == Uid`) or who is a real member of group `from_id`
/// (`from_kind == Gid`). It then says which resulting ids are acceptable.
/// `uids` and `gids` are sorted by id with no duplicates.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Rule {
    /// Kind of the `from` clause, `Uid` or `Gid`.
    pub from_kind: IdKind,
    /// Id of the `from` clause.
    pub from_id: u32,
    /// Qualifiers for user id targets as a whole.
    pub uid_flags: TargetFlags,
    /// Explicit user id targets.
    pub uids: Vec<IdSpec>,
    /// Qualifiers for group id targets as a whole.
    pub gid_flags: TargetFlags,
    /// Explicit group id targets.
    pub gids: Vec<IdSpec>,
}

impl Rule {
    /// Check if the rule applies to a requester.
    ///
    /// # Arguments
    ///
    /// * `cred` - The requester's current credential
    ///
    /// # Returns
    ///
    /// `true` if the requester's real identity matches the `from` clause
    pub fn applies_to(&self, cred: &Credential) -> bool {
        match self.from_kind {
            IdKind::Uid => cred.ruid == self.from_id,
            IdKind::Gid => cred.is_group_member(self.from_id),
            IdKind::Any => false,
        }
    }

    /// Check if the rule grants a transition from `old` to `new`.
    ///
    /// Applicability is not checked here; see [`Rule::applies_to`].
    pub fn grants(&self, old: &Credential, new: &Credential) -> bool {
        grant::users_allowed(self, old, new)
            && grant::primary_groups_allowed(self, old, new)
            && grant::supplementary_groups_allowed(self, old, new)
    }

    /// Find an explicit user id target.
    pub fn uid_spec(&self, uid: u32) -> Option<&IdSpec> {
        lookup(&self.uids, uid)
    }

    /// Find an explicit group id target.
    pub fn gid_spec(&self, gid: u32) -> Option<&IdSpec> {
        lookup(&self.gids, gid)
    }

    /// Count explicit group targets required as supplementary groups.
    pub fn required_supplementary_count(&self) -> usize {
        if !self.gid_flags.has_explicit_required {
            return 0;
        }
        self.gids
            .iter()
            .filter(|spec| spec.flags.supplementary == Supplementary::Required)
            .count()
    }
}

fn lookup(specs: &[IdSpec], id: u32) -> Option<&IdSpec> {
    specs
        .binary_search_by_key(&id, |spec| spec.id)
        .ok()
        .map(|idx| &specs[idx])
}

/// An immutable, ordered collection of compiled rules.
///
/// Keeps the exact text it was compiled from so that it can be echoed back
/// to administrators. Rule order follows the text: the first rule that
/// applies to a requester decides.
///
/// # Example
///
/// ```
/// use credgate_rules::{compile, RuleSet};
///
/// let set = compile("uid=1001>uid=1010; gid=20>any").unwrap();
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.text(), "uid=1001>uid=1010; gid=20>any");
///
/// assert!(RuleSet::empty().is_empty());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct RuleSet {
    text: String,
    rules: Vec<Rule>,
    compiled_at: DateTime<Utc>,
}

impl RuleSet {
    pub(crate) fn new(text: String, rules: Vec<Rule>) -> Self {
        Self {
            text,
            rules,
            compiled_at: Utc::now(),
        }
    }

    /// Create an empty rule set. It never applies, so it always denies.
    pub fn empty() -> Self {
        Self::new(String::new(), Vec::new())
    }

    /// The text this set was compiled from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The rules in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// When this set was compiled.
    pub fn compiled_at(&self) -> DateTime<Utc> {
        self.compiled_at
    }

    /// Get the count of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decide a transition against this set. See [`grant::decide`].
    pub fn decide(&self, old: &Credential, new: &Credential) -> Decision {
        grant::decide(old, new, self)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::empty()
    }
}
