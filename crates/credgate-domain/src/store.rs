//! Rule set store keyed by domain
//!
//! Domains live in an arena addressed by [`DomainId`]. A handle pairs a
//! slot index with the slot's generation. Destroying a domain vacates its
//! slot and bumps the generation, so the slot can host a new domain while
//! stale handles to the old one report [`DomainError::NotFound`].
//!
//! The arena lock only guards the tree shape (creation and destruction).
//! Rule sets are swapped per domain through an [`ArcSwapOption`], so
//! installing rules never waits for readers and readers never wait for
//! installers.

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use credgate_rules::RuleSet;

use crate::error::{DomainError, DomainResult};

/// Handle to a domain in a [`DomainStore`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainId {
    index: u32,
    generation: u32,
}

impl DomainId {
    /// The root domain. It always exists and always owns a rule set.
    pub const ROOT: DomainId = DomainId {
        index: 0,
        generation: 0,
    };

    /// Check if this is the root domain.
    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }

    /// Arena slot of this domain.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// How many earlier domains occupied the same slot.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// The rule set in effect for a domain, and the domain that owns it.
///
/// Holding a `Resolved` keeps its rule set alive; replacing or clearing the
/// owner's rules afterwards does not affect it.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The rule set in effect.
    pub rules: Arc<RuleSet>,
    /// The nearest domain, starting from the queried one, that owns rules.
    pub owner: DomainId,
}

struct DomainNode {
    name: String,
    parent: Option<DomainId>,
    children: Vec<DomainId>,
    /// `None` means "inherit from parent". Never `None` for the root.
    rules: ArcSwapOption<RuleSet>,
}

struct Slot {
    generation: u32,
    node: Option<DomainNode>,
}

/// Slots plus the indices of vacated ones.
struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Arena {
    fn with_root(root: DomainNode) -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(root),
            }],
            free: Vec::new(),
            live: 1,
        }
    }

    fn get(&self, id: DomainId) -> DomainResult<&DomainNode> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(DomainError::NotFound(id))
    }

    fn get_mut(&mut self, id: DomainId) -> Option<&mut DomainNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn insert(&mut self, node: DomainNode) -> DomainResult<DomainId> {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                DomainId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = u32::try_from(self.slots.len()).map_err(|_| DomainError::Exhausted)?;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                DomainId {
                    index,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        Ok(id)
    }

    fn remove(&mut self, id: DomainId) -> Option<DomainNode> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let node = slot.node.take()?;
        self.live -= 1;

        // A slot whose generation cannot advance is retired for good.
        if let Some(next) = slot.generation.checked_add(1) {
            slot.generation = next;
            self.free.push(id.index);
        }
        Some(node)
    }
}

/// Per-domain rule set storage with inheritance.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use credgate_domain::{DomainId, DomainStore};
/// use credgate_rules::compile;
///
/// let store = DomainStore::new();
/// let parent = store.create_child(DomainId::ROOT, "parent").unwrap();
/// let child = store.create_child(parent, "child").unwrap();
///
/// store.install(parent, Arc::new(compile("gid=20>any").unwrap())).unwrap();
/// assert_eq!(store.resolve(child).unwrap().owner, parent);
///
/// store.clear(parent).unwrap();
/// assert_eq!(store.resolve(child).unwrap().owner, DomainId::ROOT);
/// ```
pub struct DomainStore {
    domains: RwLock<Arena>,
}

impl std::fmt::Debug for DomainStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainStore")
            .field("domains", &self.len())
            .field("slots", &self.slot_count())
            .finish()
    }
}

impl DomainStore {
    /// Create a store holding only the root domain, with an empty rule set.
    pub fn new() -> Self {
        Self::with_root_rules(Arc::new(RuleSet::empty()))
    }

    /// Create a store whose root domain owns `rules`.
    pub fn with_root_rules(rules: Arc<RuleSet>) -> Self {
        let root = DomainNode {
            name: "root".to_string(),
            parent: None,
            children: Vec::new(),
            rules: ArcSwapOption::from(Some(rules)),
        };
        Self {
            domains: RwLock::new(Arena::with_root(root)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Arena> {
        self.domains.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arena> {
        self.domains.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a child domain. It starts out inheriting its parent's rules.
    ///
    /// # Arguments
    ///
    /// * `parent` - The containing domain
    /// * `name` - A label for logs and introspection
    ///
    /// # Returns
    ///
    /// The new domain's handle
    pub fn create_child(&self, parent: DomainId, name: impl Into<String>) -> DomainResult<DomainId> {
        let name = name.into();
        let mut domains = self.write();
        domains.get(parent)?;

        let id = domains.insert(DomainNode {
            name: name.clone(),
            parent: Some(parent),
            children: Vec::new(),
            rules: ArcSwapOption::empty(),
        })?;
        if let Some(node) = domains.get_mut(parent) {
            node.children.push(id);
        }

        tracing::debug!(domain = %id, parent = %parent, name = %name, "Domain created");
        Ok(id)
    }

    /// Make `domain` own `rules`, replacing whatever it owned or inherited.
    ///
    /// The previous rule set is released after the swap; requests already
    /// holding it keep it until they finish.
    pub fn install(&self, domain: DomainId, rules: Arc<RuleSet>) -> DomainResult<()> {
        let previous = {
            let domains = self.read();
            domains.get(domain)?.rules.swap(Some(rules))
        };

        tracing::info!(
            domain = %domain,
            replaced = previous.is_some(),
            "Rule set installed"
        );
        drop(previous);
        Ok(())
    }

    /// Make `domain` inherit its parent's rules, releasing its own.
    ///
    /// The root has no parent, so clearing it installs an empty rule set.
    pub fn clear(&self, domain: DomainId) -> DomainResult<()> {
        if domain.is_root() {
            tracing::warn!("Root domain cannot inherit; installing an empty rule set");
            return self.install(domain, Arc::new(RuleSet::empty()));
        }

        let previous = {
            let domains = self.read();
            domains.get(domain)?.rules.swap(None)
        };

        tracing::info!(domain = %domain, released = previous.is_some(), "Domain now inherits rules");
        drop(previous);
        Ok(())
    }

    /// Find the rule set in effect for `domain`.
    ///
    /// Walks from `domain` towards the root and returns the first rule set
    /// found, along with its owner. The caller holds a reference to the
    /// returned set for as long as it keeps the [`Resolved`] value.
    pub fn resolve(&self, domain: DomainId) -> DomainResult<Resolved> {
        let domains = self.read();
        let mut current = domain;
        loop {
            let node = domains.get(current)?;
            if let Some(rules) = node.rules.load_full() {
                return Ok(Resolved {
                    rules,
                    owner: current,
                });
            }
            match node.parent {
                Some(parent) => current = parent,
                // Only the root lacks a parent, and it always owns rules.
                None => {
                    return Ok(Resolved {
                        rules: Arc::new(RuleSet::empty()),
                        owner: current,
                    })
                }
            }
        }
    }

    /// The rule set `domain` owns itself, or `None` if it inherits.
    pub fn own_rules(&self, domain: DomainId) -> DomainResult<Option<Arc<RuleSet>>> {
        let domains = self.read();
        Ok(domains.get(domain)?.rules.load_full())
    }

    /// Tear down a domain for good, releasing its own rule set.
    ///
    /// Children must be destroyed first. The handle becomes invalid.
    pub fn destroy(&self, domain: DomainId) -> DomainResult<()> {
        if domain.is_root() {
            return Err(DomainError::RootImmutable);
        }

        let node = {
            let mut domains = self.write();
            let node = domains.get(domain)?;
            if !node.children.is_empty() {
                return Err(DomainError::HasChildren(domain));
            }
            let parent = node.parent;

            let node = domains.remove(domain);
            if let Some(parent_node) = parent.and_then(|p| domains.get_mut(p)) {
                parent_node.children.retain(|child| *child != domain);
            }
            node
        };

        tracing::info!(domain = %domain, "Domain destroyed");
        drop(node);
        Ok(())
    }

    /// The parent of `domain`, `None` for the root.
    pub fn parent(&self, domain: DomainId) -> DomainResult<Option<DomainId>> {
        let domains = self.read();
        Ok(domains.get(domain)?.parent)
    }

    /// The live children of `domain`, in creation order.
    pub fn children(&self, domain: DomainId) -> DomainResult<Vec<DomainId>> {
        let domains = self.read();
        Ok(domains.get(domain)?.children.clone())
    }

    /// The label given to `domain` at creation.
    pub fn name(&self, domain: DomainId) -> DomainResult<String> {
        let domains = self.read();
        Ok(domains.get(domain)?.name.clone())
    }

    /// Check if `domain` is a live domain of this store.
    pub fn contains(&self, domain: DomainId) -> bool {
        self.read().get(domain).is_ok()
    }

    /// Get the count of live domains, root included.
    pub fn len(&self) -> usize {
        self.read().live
    }

    /// Get the count of arena slots, live or vacant.
    pub fn slot_count(&self) -> usize {
        self.read().slots.len()
    }

    /// Always false: the root domain cannot be removed.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for DomainStore {
    fn default() -> Self {
        Self::new()
    }
}
