//! # Credgate Rules
//!
//! This crate provides the rule language of the credential-transition
//! policy engine: the data model, the parser that compiles rule text into
//! a [`RuleSet`], and the grant evaluator that decides whether a proposed
//! credential change is permitted.
//!
//! ## Overview
//!
//! The credgate-rules crate handles:
//! - **Credentials**: effective/real/saved user and group ids plus
//!   supplementary groups
//! - **Rules**: a `from` clause selecting requesters and target clauses
//!   describing acceptable resulting ids
//! - **Parsing**: atomic compilation of rule text with byte-offset errors
//! - **Granting**: first-applicable-rule evaluation returning Allow or Deny
//!
//! ## Rule Syntax
//!
//! ```text
//! rules   := rule (';' rule)*
//! rule    := from '>' target (',' target)*      (':' is accepted for '>')
//! from    := ("uid" | "gid") '=' id
//! target  := [flag] ("uid" | "gid") '=' (id | '.' | '*' | "any")
//!          | "any"
//! flag    := '+' (allow as supplementary)
//!          | '!' (require as supplementary)
//!          | '-' (forbid as supplementary)
//!
//! Examples:
//!   "uid=1001>uid=1010,gid=1010"   - 1001 may become 1010:1010
//!   "gid=1010>any"                 - members of 1010 may become anything
//!   "uid=1001>uid=0,gid=0,+gid=*"  - 1001 may become root with any groups
//! ```
//!
//! When a rule says nothing about user ids, `uid=.` is implied. When it
//! says nothing about group ids, `gid=.,!gid=.` is implied: groups stay as
//! they are.
//!
//! ## Usage
//!
//! ```rust
//! use credgate_rules::{compile, Credential, Decision};
//!
//! let rules = compile("uid=1001>uid=1010,gid=1010").unwrap();
//!
//! let old = Credential::new(1001, 1001);
//! let new = Credential::new(1010, 1010);
//! assert_eq!(rules.decide(&old, &new), Decision::Allow);
//!
//! let other = Credential::new(1011, 1010);
//! assert_eq!(rules.decide(&old, &other), Decision::Deny);
//! ```

pub mod credential;
pub mod error;
pub mod flags;
pub mod grant;
pub mod parser;
pub mod rule;

// Re-export main types for convenience
pub use credential::{ChangeSet, Credential, CredentialField};
pub use error::{ParseError, ParseResult};
pub use flags::{IdKind, Supplementary, TargetFlags};
pub use grant::{decide, Decision};
pub use parser::{compile, compile_with_limit};
pub use rule::{IdSpec, Rule, RuleSet, MAX_LEN};
