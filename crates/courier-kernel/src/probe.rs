//! Capability probe.
//!
//! Answers two questions for the resolution engine:
//!
//! - is a named component available in the running environment?
//! - does a named configuration key resolve to a value?
//!
//! The answers come from a [`CapabilitySource`] supplied by the environment
//! layer and are memoized per name for the lifetime of the probe. A fact,
//! once computed, keeps its value until [`CapabilityProbe::reset`] is called.
//!
//! The probe is an ordinary value injected wherever resolution happens; there
//! is no process-wide singleton. Share it behind an [`Arc`] when several
//! registries resolve against the same environment.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

// ─────────────────────────────────────────────────────────────────────────────
// Capability source contract
// ─────────────────────────────────────────────────────────────────────────────

/// Boundary contract consumed by the probe.
///
/// Implementations must be side-effect free: the probe may call them more
/// than once for the same name when two threads race on a first lookup.
pub trait CapabilitySource: Send + Sync {
    /// Whether the named component is available.
    fn type_loadable(&self, name: &str) -> bool;

    /// Whether the configuration key resolves to a value.
    fn has_config_value(&self, key: &str) -> bool {
        self.config_value(key).is_some()
    }

    /// The resolved value of a configuration key.
    fn config_value(&self, key: &str) -> Option<String>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Facts
// ─────────────────────────────────────────────────────────────────────────────

/// What a cached fact is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FactKind {
    /// Component availability.
    Type,
    /// Configuration key presence.
    Config,
}

/// A memoized answer held by the probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFact {
    pub kind: FactKind,
    pub key: String,
    pub present: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Probe
// ─────────────────────────────────────────────────────────────────────────────

/// Memoizing front for a [`CapabilitySource`].
pub struct CapabilityProbe {
    source: Arc<dyn CapabilitySource>,
    types: DashMap<String, bool>,
    config_keys: DashMap<String, bool>,
}

impl CapabilityProbe {
    pub fn new(source: Arc<dyn CapabilitySource>) -> Self {
        Self {
            source,
            types: DashMap::new(),
            config_keys: DashMap::new(),
        }
    }

    /// Wrap an owned source.
    pub fn from_source<S: CapabilitySource + 'static>(source: S) -> Self {
        Self::new(Arc::new(source))
    }

    /// Probe over an environment with no components and no configuration.
    ///
    /// Used where guards only inspect the subject.
    pub fn empty() -> Self {
        Self::from_source(Barren)
    }

    /// Memoized component availability.
    pub fn type_present(&self, name: &str) -> bool {
        memoized(&self.types, name, FactKind::Type, |n| {
            self.source.type_loadable(n)
        })
    }

    /// Memoized configuration key presence.
    pub fn config_present(&self, key: &str) -> bool {
        memoized(&self.config_keys, key, FactKind::Config, |k| {
            self.source.has_config_value(k)
        })
    }

    /// Current value of a configuration key. Not cached.
    pub fn config_value(&self, key: &str) -> Option<String> {
        self.source.config_value(key)
    }

    /// Drop every cached fact.
    pub fn reset(&self) {
        self.types.clear();
        self.config_keys.clear();
        trace!("capability facts reset");
    }

    /// Snapshot of the cached facts, ordered by kind then key.
    pub fn facts(&self) -> Vec<CapabilityFact> {
        let mut facts: Vec<CapabilityFact> = self
            .types
            .iter()
            .map(|e| CapabilityFact {
                kind: FactKind::Type,
                key: e.key().clone(),
                present: *e.value(),
            })
            .chain(self.config_keys.iter().map(|e| CapabilityFact {
                kind: FactKind::Config,
                key: e.key().clone(),
                present: *e.value(),
            }))
            .collect();
        facts.sort_by(|a, b| (a.kind, &a.key).cmp(&(b.kind, &b.key)));
        facts
    }
}

struct Barren;

impl CapabilitySource for Barren {
    fn type_loadable(&self, _name: &str) -> bool {
        false
    }

    fn config_value(&self, _key: &str) -> Option<String> {
        None
    }
}

impl fmt::Debug for CapabilityProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityProbe")
            .field("types", &self.types.len())
            .field("config_keys", &self.config_keys.len())
            .finish()
    }
}

// The shard guard is released before probing so a source may itself consult
// the probe. Two threads racing on the same name both probe and write the
// same answer.
fn memoized(
    cache: &DashMap<String, bool>,
    name: &str,
    kind: FactKind,
    probe: impl FnOnce(&str) -> bool,
) -> bool {
    if let Some(hit) = cache.get(name) {
        return *hit;
    }
    let present = probe(name);
    trace!(?kind, name, present, "capability probed");
    cache.insert(name.to_owned(), present);
    present
}
