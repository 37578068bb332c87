//! Auto-detecting dispatcher.
//!
//! Each candidate carries a detector: a [`Condition`] over the invocation,
//! evaluated at call time (a guard, by contrast, gates eligibility against
//! configuration-time facts). Dispatch picks the first candidate, in
//! registration order, whose detector accepts the invocation.
//!
//! A candidate may also carry a guard over the probed capabilities only.
//! Candidates whose guard rejects are not eligible and take no part in
//! detection.
//!
//! When exactly one candidate is eligible detection is skipped and that
//! candidate is returned directly: a single configured engine must not be
//! rejected because its detector is imprecise.

use crate::condition::Condition;
use crate::condition::conditions::always_true;
use crate::probe::CapabilityProbe;
use crate::registry::{EvaluatedGuard, NoMatchError};
use std::fmt;
use tracing::debug;

struct Detectable<V, I> {
    key: String,
    guard: Condition<()>,
    detector: Condition<V>,
    implementation: I,
}

/// Outcome of [`DetectingDispatcher::dispatch_by_detection`].
#[derive(Debug)]
pub struct Detected<'a, I> {
    pub key: &'a str,
    pub implementation: &'a I,
    /// `true` when the single-candidate bypass was taken.
    pub bypassed: bool,
}

/// Ordered list of implementations selected by invocation-time detection.
pub struct DetectingDispatcher<V, I> {
    name: String,
    candidates: Vec<Detectable<V, I>>,
}

impl<V, I> DetectingDispatcher<V, I> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append an always eligible candidate. An already registered key keeps its entry.
    pub fn register(&mut self, key: impl Into<String>, detector: Condition<V>, implementation: I) -> &mut Self {
        self.register_guarded(key, always_true(), detector, implementation)
    }

    /// Append a candidate that is eligible only while `guard` accepts.
    pub fn register_guarded(
        &mut self,
        key: impl Into<String>,
        guard: Condition<()>,
        detector: Condition<V>,
        implementation: I,
    ) -> &mut Self {
        let key = key.into();
        if self.candidates.iter().any(|c| c.key == key) {
            debug!(dispatcher = %self.name, %key, "detector already registered");
            return self;
        }
        debug!(dispatcher = %self.name, %key, guard = %guard, detector = %detector, "detector registered");
        self.candidates.push(Detectable {
            key,
            guard,
            detector,
            implementation,
        });
        self
    }

    pub fn keys(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.key.as_str()).collect()
    }

    /// Keys of the candidates whose guard accepts, in registration order.
    pub fn eligible_keys(&self, probe: &CapabilityProbe) -> Vec<&str> {
        self.eligible(probe).map(|c| c.key.as_str()).collect()
    }

    fn eligible<'a>(&'a self, probe: &CapabilityProbe) -> impl Iterator<Item = &'a Detectable<V, I>> {
        self.candidates.iter().filter(move |c| {
            let eligible = c.guard.accept(&(), probe);
            if !eligible {
                debug!(dispatcher = %self.name, key = %c.key, guard = %c.guard, "candidate not eligible");
            }
            eligible
        })
    }

    pub fn get(&self, key: &str) -> Option<&I> {
        self.candidates
            .iter()
            .find(|c| c.key == key)
            .map(|c| &c.implementation)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl<V: fmt::Debug, I> DetectingDispatcher<V, I> {
    /// Pick the implementation for one invocation.
    pub fn dispatch_by_detection(
        &self,
        invocation: &V,
        probe: &CapabilityProbe,
    ) -> Result<Detected<'_, I>, NoMatchError> {
        let eligible: Vec<_> = self.eligible(probe).collect();
        if let &[single] = eligible.as_slice() {
            debug!(dispatcher = %self.name, key = %single.key, "single candidate, detection skipped");
            return Ok(Detected {
                key: &single.key,
                implementation: &single.implementation,
                bypassed: true,
            });
        }

        for candidate in eligible {
            let detected = candidate.detector.accept(invocation, probe);
            debug!(dispatcher = %self.name, key = %candidate.key, detected, "detector evaluated");
            if detected {
                return Ok(Detected {
                    key: &candidate.key,
                    implementation: &candidate.implementation,
                    bypassed: false,
                });
            }
        }

        Err(NoMatchError {
            target: self.name.clone(),
            subject: format!("{invocation:?}"),
            evaluated: self
                .candidates
                .iter()
                .map(|c| EvaluatedGuard {
                    key: c.key.clone(),
                    guard: if c.guard.is_always_true() {
                        c.detector.to_string()
                    } else {
                        format!("{} then {}", c.guard, c.detector)
                    },
                })
                .collect(),
        })
    }
}

impl<V, I> fmt::Debug for DetectingDispatcher<V, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectingDispatcher")
            .field("name", &self.name)
            .field("candidates", &self.keys())
            .finish()
    }
}
