//! Candidate registry.
//!
//! A [`Registry`] is an ordered, append-only list of guarded
//! implementations. Registration order is the only ordering relation and it
//! decides ties: when several guards accept the same subject, the earliest
//! registered candidate wins, silently.
//!
//! Registries are filled during a configuration phase and read afterwards;
//! selection methods take `&self` and never reorder or mutate the list. Wrap a
//! finished registry in an [`Arc`] to share it between dispatching threads.

use crate::condition::Condition;
use crate::probe::CapabilityProbe;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

mod selector;
pub use selector::{EvaluatedGuard, MatchRequirement, NoMatchError};

/// Hook re-evaluated on every dispatch, letting an implementation report
/// whether it is currently enabled.
pub type RuntimeGuard<S, I> = Arc<dyn Fn(&I) -> Condition<S> + Send + Sync>;

/// A guarded implementation.
pub struct Candidate<S, I> {
    key: String,
    guard: Option<Condition<S>>,
    runtime_guard: Option<RuntimeGuard<S, I>>,
    implementation: I,
}

impl<S, I> Candidate<S, I> {
    /// Candidate without a guard; equivalent to an always-true guard.
    pub fn unguarded(key: impl Into<String>, implementation: I) -> Self {
        Self {
            key: key.into(),
            guard: None,
            runtime_guard: None,
            implementation,
        }
    }

    pub fn guarded(key: impl Into<String>, guard: Condition<S>, implementation: I) -> Self {
        Self {
            key: key.into(),
            guard: Some(guard),
            runtime_guard: None,
            implementation,
        }
    }

    /// Attach a per-dispatch hook whose condition is ANDed with the guard.
    pub fn with_runtime_guard(
        mut self,
        hook: impl Fn(&I) -> Condition<S> + Send + Sync + 'static,
    ) -> Self {
        self.runtime_guard = Some(Arc::new(hook));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn guard(&self) -> Option<&Condition<S>> {
        self.guard.as_ref()
    }

    pub fn implementation(&self) -> &I {
        &self.implementation
    }

    pub fn into_implementation(self) -> I {
        self.implementation
    }

    /// Whether the guard, then the runtime hook, accept the subject.
    pub fn accepts(&self, subject: &S, probe: &CapabilityProbe) -> bool {
        let guarded = self
            .guard
            .as_ref()
            .is_none_or(|guard| guard.accept(subject, probe));
        guarded
            && self
                .runtime_guard
                .as_ref()
                .is_none_or(|hook| hook(&self.implementation).accept(subject, probe))
    }

    /// Human-readable guard used in diagnostics.
    pub fn describe_guard(&self) -> String {
        match (&self.guard, &self.runtime_guard) {
            (None, None) => "true".to_string(),
            (Some(guard), None) => guard.to_string(),
            (None, Some(_)) => "runtime()".to_string(),
            (Some(guard), Some(_)) => format!("and({guard}, runtime())"),
        }
    }
}

impl<S, I> fmt::Debug for Candidate<S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("key", &self.key)
            .field("guard", &self.describe_guard())
            .finish_non_exhaustive()
    }
}

/// Ordered, append-only list of candidates.
pub struct Registry<S, I> {
    name: String,
    candidates: Vec<Candidate<S, I>>,
}

impl<S, I> Registry<S, I> {
    /// `name` identifies the registry in logs and errors.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a candidate.
    ///
    /// Registering a key that is already present keeps the existing entry
    /// unchanged and returns it; the new candidate is dropped.
    pub fn register(&mut self, candidate: Candidate<S, I>) -> &Candidate<S, I> {
        if let Some(index) = self.position(&candidate.key) {
            debug!(registry = %self.name, key = %candidate.key, "candidate already registered");
            return &self.candidates[index];
        }
        debug!(
            registry = %self.name,
            key = %candidate.key,
            guard = %candidate.describe_guard(),
            position = self.candidates.len(),
            "candidate registered"
        );
        self.candidates.push(candidate);
        &self.candidates[self.candidates.len() - 1]
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Candidate<S, I>> {
        self.candidates.iter().find(|c| c.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate<S, I>> {
        self.candidates.iter()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c.key == key)
    }
}

impl<S, I> fmt::Debug for Registry<S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("candidates", &self.candidates)
            .finish()
    }
}
