//! # Target Flags
//!
//! Qualifiers attached to target ids, or to a whole category of targets,
//! inside a rule.

use serde::{Deserialize, Serialize};

/// Kind of identifier a clause talks about.
///
/// `Uid` and `Gid` appear in `from` clauses and typed targets. `Any` is
/// the type of the bare `any` target, which accepts every resulting id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    /// User id.
    Uid,
    /// Group id.
    Gid,
    /// Any id of any kind.
    Any,
}

impl IdKind {
    /// Get the string representation of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdKind::Uid => "uid",
            IdKind::Gid => "gid",
            IdKind::Any => "any",
        }
    }

    /// Parse a kind from its rule-text keyword.
    ///
    /// # Example
    ///
    /// ```
    /// use credgate_rules::IdKind;
    ///
    /// assert_eq!(IdKind::parse("uid"), Some(IdKind::Uid));
    /// assert_eq!(IdKind::parse("*"), Some(IdKind::Any));
    /// assert_eq!(IdKind::parse("user"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uid" => Some(IdKind::Uid),
            "gid" => Some(IdKind::Gid),
            "any" | "*" => Some(IdKind::Any),
            _ => None,
        }
    }
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a group may appear among the resulting supplementary groups.
///
/// Allowed and required merge into required. Forbidden excludes both.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Supplementary {
    /// Nothing was said about supplementary membership.
    #[default]
    Unspecified,
    /// May be a supplementary group (`+`).
    Allowed,
    /// Must be a supplementary group (`!`).
    Required,
    /// Must not be a supplementary group (`-`).
    Forbidden,
}

impl Supplementary {
    /// Parse a target flag character.
    pub fn from_flag(c: char) -> Option<Self> {
        match c {
            '+' => Some(Supplementary::Allowed),
            '!' => Some(Supplementary::Required),
            '-' => Some(Supplementary::Forbidden),
            _ => None,
        }
    }

    /// Combine two qualifiers given to the same target.
    ///
    /// # Returns
    ///
    /// The merged qualifier, or `None` if the two are incompatible
    ///
    /// # Example
    ///
    /// ```
    /// use credgate_rules::Supplementary;
    ///
    /// let merged = Supplementary::Allowed.merge(Supplementary::Required);
    /// assert_eq!(merged, Some(Supplementary::Required));
    /// assert_eq!(Supplementary::Allowed.merge(Supplementary::Forbidden), None);
    /// ```
    pub fn merge(self, other: Supplementary) -> Option<Supplementary> {
        use Supplementary::*;
        match (self, other) {
            (Unspecified, x) | (x, Unspecified) => Some(x),
            (Forbidden, Forbidden) => Some(Forbidden),
            (Forbidden, _) | (_, Forbidden) => None,
            (Required, _) | (_, Required) => Some(Required),
            (Allowed, Allowed) => Some(Allowed),
        }
    }

    /// Check if a group carrying this qualifier may be a supplementary group.
    pub fn accepts(&self) -> bool {
        matches!(self, Supplementary::Allowed | Supplementary::Required)
    }
}

/// Qualifiers for one target id, or for a whole category of targets.
///
/// On an [`IdSpec`](crate::IdSpec) only `primary` and `supplementary` are
/// meaningful. On a rule's per-kind flags, `current` says the requester's
/// present ids are acceptable, with `primary` and `supplementary` telling
/// in which role; `any` and `any_supplementary` accept every id.
///
/// The `has_*` fields record what the rule text said and are checked when a
/// rule finishes parsing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TargetFlags {
    /// Acceptable as a primary group (or, for uids, unused).
    pub primary: bool,
    /// Supplementary group qualifier.
    pub supplementary: Supplementary,
    /// Any id of this kind is accepted (primary category for gids).
    pub any: bool,
    /// The requester's current ids of this kind are accepted.
    pub current: bool,
    /// Any id is accepted as a supplementary group.
    pub any_supplementary: bool,
    /// A primary-group clause was written.
    pub has_primary_clause: bool,
    /// A supplementary-group clause was written.
    pub has_supplementary_clause: bool,
    /// At least one explicit id is required as a supplementary group.
    pub has_explicit_required: bool,
}

impl TargetFlags {
    /// Flags for a single explicit target id.
    ///
    /// # Arguments
    ///
    /// * `supplementary` - `None` for a primary-group target, or the
    ///   supplementary qualifier given by the target's flag
    pub fn for_target(supplementary: Option<Supplementary>) -> Self {
        match supplementary {
            None => Self {
                primary: true,
                ..Self::default()
            },
            Some(mode) => Self {
                supplementary: mode,
                ..Self::default()
            },
        }
    }

    /// Merge another target's qualifiers into these.
    ///
    /// # Returns
    ///
    /// `false` if the supplementary qualifiers conflict; `self` is left
    /// unchanged in that case
    pub fn merge(&mut self, other: &TargetFlags) -> bool {
        let Some(supplementary) = self.supplementary.merge(other.supplementary) else {
            return false;
        };
        self.supplementary = supplementary;
        self.primary |= other.primary;
        true
    }

    /// Qualifier that applies to the requester's current supplementary
    /// groups, `Unspecified` unless `.` was given as a supplementary target.
    pub fn current_supplementary(&self) -> Supplementary {
        if self.current {
            self.supplementary
        } else {
            Supplementary::Unspecified
        }
    }
}
