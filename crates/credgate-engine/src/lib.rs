//! # Credgate Engine
//!
//! This crate decides whether a process may switch its user and group
//! identifiers, using rule sets configured per security domain.
//!
//! ## Overview
//!
//! - **Administration**: [`Engine::set_text`] compiles and installs rule
//!   text for a domain, [`Engine::get_text`] echoes it back,
//!   [`Engine::inherit`] and [`Engine::disable`] switch a domain between
//!   inheriting and owning rules
//! - **Evaluation**: [`Engine::begin`] resolves the rules in effect for the
//!   requesting domain into a [`TransitionContext`], which records the
//!   candidate credential and gives the verdict
//! - **Configuration**: [`EngineConfig`] loads from `CREDGATE_*`
//!   environment variables
//!
//! The engine never installs a `tracing` subscriber; applications do.
//!
//! ## Usage
//!
//! ```rust
//! use credgate_engine::{Credential, Decision, DomainId, Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::from_env()).unwrap();
//! let jail = engine.create_domain(DomainId::ROOT, "jail").unwrap();
//! engine.set_text(jail, "uid=1001>uid=1010,gid=1010").unwrap();
//!
//! if let Some(mut ctx) = engine.begin(jail) {
//!     ctx.observe(Credential::new(1001, 1001), Credential::new(1010, 1010));
//!     let decision = ctx.decide();
//!     engine.end(Some(ctx));
//!     assert!(decision == Decision::Allow || !engine.is_enabled());
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod transition;

// Re-export main types
pub use config::{ConfigError, EngineConfig};
pub use engine::{DomainMode, Engine};
pub use error::{EngineError, EngineResult};
pub use transition::TransitionContext;

// Re-export the types callers need to drive an evaluation
pub use credgate_domain::DomainId;
pub use credgate_rules::{ChangeSet, Credential, CredentialField, Decision, ParseError, RuleSet};
