//! # Credgate Domain
//!
//! This crate stores compiled rule sets per security domain and resolves
//! the rule set in effect for any domain of a containment hierarchy.
//!
//! ## Overview
//!
//! - **Domains**: nodes of a tree rooted at [`DomainId::ROOT`], addressed by
//!   handle
//! - **Ownership**: a domain either owns a rule set or inherits from its
//!   nearest owning ancestor
//! - **Snapshots**: each domain's rule set lives in an atomically swapped
//!   slot; readers take an `Arc` and keep using it even if an administrator
//!   replaces the set meanwhile
//!
//! The root domain always owns a rule set (possibly empty), so resolution
//! always finds one.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use credgate_domain::{DomainId, DomainStore};
//! use credgate_rules::compile;
//!
//! let store = DomainStore::new();
//! let jail = store.create_child(DomainId::ROOT, "jail").unwrap();
//!
//! // A fresh child inherits from the root.
//! assert_eq!(store.resolve(jail).unwrap().owner, DomainId::ROOT);
//!
//! store.install(jail, Arc::new(compile("uid=1001>uid=1010").unwrap())).unwrap();
//! let resolved = store.resolve(jail).unwrap();
//! assert_eq!(resolved.owner, jail);
//! assert_eq!(resolved.rules.text(), "uid=1001>uid=1010");
//! ```

pub mod error;
pub mod store;

// Re-export main types
pub use error::{DomainError, DomainResult};
pub use store::{DomainId, DomainStore, Resolved};
