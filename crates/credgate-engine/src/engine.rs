//! # Engine
//!
//! The [`Engine`] ties rule compilation to the domain store and exposes two
//! surfaces:
//!
//! - **Administration**: read and replace a domain's rule text, switch a
//!   domain between owning rules and inheriting them, manage domains
//! - **Evaluation**: [`Engine::begin`] hands out a [`TransitionContext`]
//!   for each credential transition request

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use credgate_domain::{DomainId, DomainStore};
use credgate_rules::{compile_with_limit, RuleSet};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::transition::TransitionContext;

/// Whether a domain owns its rules or inherits them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DomainMode {
    /// The domain owns a rule set, possibly empty.
    Own,
    /// The domain uses its nearest owning ancestor's rule set.
    Inherit,
}

/// Credential transition engine.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    enabled: AtomicBool,
    store: DomainStore,
}

impl Engine {
    /// Create an engine with an empty root rule set.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration, validated before use
    ///
    /// # Returns
    ///
    /// The engine, or a configuration error
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        Self::with_store(config, DomainStore::new())
    }

    /// Create an engine over an existing domain store.
    pub fn with_store(config: EngineConfig, store: DomainStore) -> EngineResult<Self> {
        config.validate()?;
        tracing::info!(
            enabled = config.enabled,
            max_rule_len = config.max_rule_len,
            "Credential transition engine initialized"
        );

        Ok(Self {
            enabled: AtomicBool::new(config.enabled),
            config,
            store,
        })
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the underlying domain store.
    pub fn store(&self) -> &DomainStore {
        &self.store
    }

    /// Check if the engine currently intervenes in transition requests.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turn the engine on or off. Requests already in flight are unaffected.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::AcqRel);
        if was != enabled {
            tracing::info!(enabled, "Credential transition engine toggled");
        }
    }

    // ---- Administration ----

    /// Compile rule text under the configured length limit.
    pub fn compile(&self, text: &str) -> EngineResult<RuleSet> {
        compile_with_limit(text, self.config.max_rule_len).map_err(|err| {
            if self.config.log_parse_errors {
                tracing::warn!(offset = err.offset, error = %err.message, "Rejected rule text");
            }
            err.into()
        })
    }

    /// Compile `text` and make it the rule set owned by `domain`.
    ///
    /// The empty string installs an own, always-deny rule set; it does not
    /// revert the domain to inheritance. On error nothing changes.
    #[instrument(skip_all, fields(domain = %domain))]
    pub fn set_text(&self, domain: DomainId, text: &str) -> EngineResult<()> {
        let rules = self.compile(text)?;
        tracing::debug!(rules = rules.len(), compiled_at = %rules.compiled_at(), "Rule text compiled");
        self.store.install(domain, Arc::new(rules))?;
        Ok(())
    }

    /// The text last installed for `domain`, or the empty string when the
    /// domain inherits.
    pub fn get_text(&self, domain: DomainId) -> EngineResult<String> {
        Ok(self
            .store
            .own_rules(domain)?
            .map(|rules| rules.text().to_string())
            .unwrap_or_default())
    }

    /// Revert `domain` to inheriting its parent's rules.
    #[instrument(skip_all, fields(domain = %domain))]
    pub fn inherit(&self, domain: DomainId) -> EngineResult<()> {
        self.store.clear(domain)?;
        Ok(())
    }

    /// Deny every transition requested from `domain` and its inheriting
    /// descendants.
    #[instrument(skip_all, fields(domain = %domain))]
    pub fn disable(&self, domain: DomainId) -> EngineResult<()> {
        self.store.install(domain, Arc::new(RuleSet::empty()))?;
        Ok(())
    }

    /// Report whether `domain` owns rules or inherits them.
    pub fn mode(&self, domain: DomainId) -> EngineResult<DomainMode> {
        Ok(match self.store.own_rules(domain)? {
            Some(_) => DomainMode::Own,
            None => DomainMode::Inherit,
        })
    }

    /// Create a child of `parent` that inherits its rules.
    #[instrument(skip_all, fields(parent = %parent, name = %name))]
    pub fn create_domain(&self, parent: DomainId, name: &str) -> EngineResult<DomainId> {
        Ok(self.store.create_child(parent, name)?)
    }

    /// Tear down `domain` for good.
    #[instrument(skip_all, fields(domain = %domain))]
    pub fn destroy_domain(&self, domain: DomainId) -> EngineResult<()> {
        self.store.destroy(domain)?;
        Ok(())
    }

    // ---- Evaluation ----

    /// Start evaluating a transition requested from `domain`.
    ///
    /// Returns `None` when the engine is disabled or the domain is unknown;
    /// nothing is held in that case and the caller's remaining steps have
    /// nothing to do.
    pub fn begin(&self, domain: DomainId) -> Option<TransitionContext> {
        if !self.is_enabled() {
            return None;
        }

        match self.store.resolve(domain) {
            Ok(resolved) => {
                let ctx = TransitionContext::new(domain, resolved);
                tracing::trace!(
                    request_id = %ctx.request_id(),
                    domain = %domain,
                    owner = %ctx.owner(),
                    "Transition started"
                );
                Some(ctx)
            }
            Err(err) => {
                tracing::debug!(domain = %domain, error = %err, "Transition not evaluated");
                None
            }
        }
    }

    /// Finish a transition started with [`Engine::begin`].
    pub fn end(&self, ctx: Option<TransitionContext>) {
        if let Some(mut ctx) = ctx {
            ctx.end();
        }
    }
}
