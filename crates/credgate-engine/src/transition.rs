//! # Transition Context
//!
//! A transition request reaches the engine as several separate calls: one
//! when the request starts, one once the candidate credential is known,
//! one asking for the verdict and one when the request is over. The
//! [`TransitionContext`] returned by [`Engine::begin`](crate::Engine::begin)
//! carries the state between them.
//!
//! The context holds the rule set that was in effect when the request
//! started. Replacing or clearing the domain's rules while the request is in
//! flight does not change what this request is judged against.

use std::sync::Arc;

use uuid::Uuid;

use credgate_domain::{DomainId, Resolved};
use credgate_rules::{ChangeSet, Credential, Decision, RuleSet};

#[derive(Debug, Clone)]
struct Observation {
    old: Credential,
    new: Credential,
    changes: ChangeSet,
}

/// Per-request evaluation state.
///
/// # Example
///
/// ```
/// use credgate_engine::{Engine, EngineConfig};
/// use credgate_domain::DomainId;
/// use credgate_rules::{Credential, Decision};
///
/// let engine = Engine::new(EngineConfig::default()).unwrap();
/// engine.set_text(DomainId::ROOT, "uid=1001>uid=1010").unwrap();
///
/// let mut ctx = engine.begin(DomainId::ROOT).unwrap();
/// ctx.observe(Credential::new(1001, 1001), Credential::new(1010, 1001));
/// assert_eq!(ctx.decide(), Decision::Allow);
/// engine.end(Some(ctx));
/// ```
#[derive(Debug)]
pub struct TransitionContext {
    request_id: Uuid,
    domain: DomainId,
    owner: DomainId,
    rules: Option<Arc<RuleSet>>,
    observation: Option<Observation>,
}

impl TransitionContext {
    pub(crate) fn new(domain: DomainId, resolved: Resolved) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            domain,
            owner: resolved.owner,
            rules: Some(resolved.rules),
            observation: None,
        }
    }

    /// Identifier correlating the log lines of one request.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The domain the request originated from.
    pub fn domain(&self) -> DomainId {
        self.domain
    }

    /// The domain whose rules this request is judged against.
    pub fn owner(&self) -> DomainId {
        self.owner
    }

    /// Check if the context still holds its rule set.
    pub fn is_active(&self) -> bool {
        self.rules.is_some()
    }

    /// The rule set held for this request, if not yet released.
    pub fn rules(&self) -> Option<&RuleSet> {
        self.rules.as_deref()
    }

    /// The recorded change set, once a candidate has been observed.
    pub fn changes(&self) -> Option<&ChangeSet> {
        self.observation.as_ref().map(|o| &o.changes)
    }

    /// Record the requester's credential and the candidate.
    ///
    /// The changed fields are computed from the two credentials. Observing
    /// again replaces the previous observation.
    pub fn observe(&mut self, old: Credential, new: Credential) {
        let changes = ChangeSet::between(&old, &new);
        self.observe_with_changes(old, new, changes);
    }

    /// Record the requester's credential, the candidate and the fields the
    /// request changes, as reported by the caller.
    pub fn observe_with_changes(&mut self, old: Credential, new: Credential, changes: ChangeSet) {
        tracing::trace!(
            request_id = %self.request_id,
            changed = changes.len(),
            "Transition observed"
        );
        self.observation = Some(Observation { old, new, changes });
    }

    /// Decide the observed transition.
    ///
    /// Deny when nothing was observed, when the context was already ended,
    /// or when the request changes the security label.
    pub fn decide(&self) -> Decision {
        let decision = match (&self.rules, &self.observation) {
            (Some(rules), Some(obs)) if !obs.changes.changes_label() => {
                rules.decide(&obs.old, &obs.new)
            }
            _ => Decision::Deny,
        };

        tracing::debug!(
            request_id = %self.request_id,
            domain = %self.domain,
            decision = %decision,
            "Transition decided"
        );
        decision
    }

    /// Release the held rule set. Calling it again does nothing.
    pub fn end(&mut self) {
        if self.rules.take().is_some() {
            tracing::trace!(request_id = %self.request_id, "Transition context released");
        }
        self.observation = None;
    }
}

impl Drop for TransitionContext {
    fn drop(&mut self) {
        self.end();
    }
}
