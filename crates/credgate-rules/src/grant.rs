//! # Grant Evaluation
//!
//! Decides whether a candidate credential is permitted for a requester.
//!
//! Rules are tried in declaration order. Rules that do not apply to the
//! requester are skipped; the first one that applies decides the outcome on
//! its own. If it does not grant the candidate, the answer is Deny even if a
//! later rule would have granted it. When no rule applies, the answer is
//! Deny.

use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::flags::Supplementary;
use crate::rule::{Rule, RuleSet};

/// Outcome of a transition check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The transition is granted.
    Allow,
    /// The transition is not granted.
    Deny,
}

impl Decision {
    /// Check if this decision grants the transition.
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Get the string representation of the decision.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide a transition from `old` to `new` against a rule set.
///
/// # Arguments
///
/// * `old` - The requester's current credential
/// * `new` - The credential the requester wants
/// * `rules` - The rule set in effect for the requester
///
/// # Returns
///
/// `Decision::Allow` if the first rule applicable to `old` grants `new`,
/// `Decision::Deny` otherwise
///
/// # Example
///
/// ```
/// use credgate_rules::{compile, decide, Credential, Decision};
///
/// let rules = compile("gid=1010>any").unwrap();
/// let old = Credential::new(1001, 1001).with_groups([1010]);
/// let new = Credential::new(0, 0).with_groups([0, 5]);
///
/// assert_eq!(decide(&old, &new, &rules), Decision::Allow);
/// ```
pub fn decide(old: &Credential, new: &Credential, rules: &RuleSet) -> Decision {
    match rules.rules().iter().find(|rule| rule.applies_to(old)) {
        Some(rule) if rule.grants(old, new) => Decision::Allow,
        _ => Decision::Deny,
    }
}

fn user_allowed(rule: &Rule, old: &Credential, uid: u32) -> bool {
    let flags = &rule.uid_flags;
    flags.any || (flags.current && old.uids().contains(&uid)) || rule.uid_spec(uid).is_some()
}

/// Check the effective, real and saved user ids of `new`.
pub(crate) fn users_allowed(rule: &Rule, old: &Credential, new: &Credential) -> bool {
    if rule.uid_flags.any {
        return true;
    }
    new.uids().iter().all(|&uid| user_allowed(rule, old, uid))
}

fn primary_group_allowed(rule: &Rule, old: &Credential, gid: u32) -> bool {
    let flags = &rule.gid_flags;
    if flags.any {
        return true;
    }
    if flags.current && flags.primary && old.gids().contains(&gid) {
        return true;
    }
    rule.gid_spec(gid).is_some_and(|spec| spec.flags.primary)
}

/// Check the effective, real and saved primary group ids of `new`.
pub(crate) fn primary_groups_allowed(rule: &Rule, old: &Credential, new: &Credential) -> bool {
    new.gids()
        .iter()
        .all(|&gid| primary_group_allowed(rule, old, gid))
}

/// Check the supplementary groups of `new`.
///
/// Walks `new`'s sorted groups once, advancing in step through `old`'s
/// sorted groups (when current groups are qualified) and through the rule's
/// sorted explicit gids. A forbidden match rejects at once. After the walk,
/// every required group, current or explicit, must have been seen.
pub(crate) fn supplementary_groups_allowed(
    rule: &Rule,
    old: &Credential,
    new: &Credential,
) -> bool {
    let flags = &rule.gid_flags;
    let current = flags.current_supplementary();
    let required = rule.required_supplementary_count();

    // Fast path: nothing can reject and nothing is required.
    if flags.any_supplementary
        && required == 0
        && current != Supplementary::Forbidden
        && current != Supplementary::Required
        && !rule
            .gids
            .iter()
            .any(|spec| spec.flags.supplementary == Supplementary::Forbidden)
    {
        return true;
    }

    let old_groups = old.groups();
    let (mut old_idx, mut old_seen) = (0usize, 0usize);
    let (mut spec_idx, mut required_seen) = (0usize, 0usize);

    for &group in new.groups() {
        let mut accepted = flags.any_supplementary;

        if current != Supplementary::Unspecified {
            while old_idx < old_groups.len() && old_groups[old_idx] < group {
                old_idx += 1;
            }
            if old_groups.get(old_idx) == Some(&group) {
                match current {
                    Supplementary::Forbidden => return false,
                    Supplementary::Required => {
                        old_seen += 1;
                        accepted = true;
                    }
                    Supplementary::Allowed => accepted = true,
                    Supplementary::Unspecified => {}
                }
            }
        }

        while spec_idx < rule.gids.len() && rule.gids[spec_idx].id < group {
            spec_idx += 1;
        }
        if let Some(spec) = rule.gids.get(spec_idx).filter(|spec| spec.id == group) {
            match spec.flags.supplementary {
                Supplementary::Forbidden => return false,
                Supplementary::Required => {
                    required_seen += 1;
                    accepted = true;
                }
                Supplementary::Allowed => accepted = true,
                Supplementary::Unspecified => {}
            }
        }

        if !accepted {
            return false;
        }
    }

    if current == Supplementary::Required && old_seen != old_groups.len() {
        return false;
    }
    required_seen == required
}
