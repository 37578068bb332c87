//! Predicate selection over a [`Registry`].
//!
//! Two modes:
//!
//! - first-match: walk candidates in registration order and stop at the first
//!   whose guard accepts the subject;
//! - all-matches: every accepting candidate, in registration order.
//!
//! Ambiguity is not an error. When several guards accept, first-match returns
//! the earliest registered candidate.

use super::{Candidate, Registry};
use crate::probe::CapabilityProbe;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Cardinality a caller demands from all-matches selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchRequirement {
    /// An empty result is a valid outcome.
    #[default]
    Optional,
    /// At least one candidate must accept.
    AtLeastOne,
}

/// A guard that was evaluated while looking for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatedGuard {
    pub key: String,
    pub guard: String,
}

impl fmt::Display for EvaluatedGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.guard)
    }
}

/// No candidate accepted a subject that required one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no candidate in '{target}' accepts {subject} (evaluated: [{}])", format_guards(.evaluated))]
pub struct NoMatchError {
    /// Registry or dispatcher name.
    pub target: String,
    /// Description of the subject or invocation.
    pub subject: String,
    /// Every guard evaluated, in registration order.
    pub evaluated: Vec<EvaluatedGuard>,
}

fn format_guards(guards: &[EvaluatedGuard]) -> String {
    guards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl<S: fmt::Debug, I> Registry<S, I> {
    /// First candidate, in registration order, whose guard accepts `subject`.
    pub fn find_first_match(&self, subject: &S, probe: &CapabilityProbe) -> Option<&Candidate<S, I>> {
        let winner = self.candidates.iter().find(|c| {
            let accepted = c.accepts(subject, probe);
            debug!(registry = %self.name, key = %c.key, accepted, "guard evaluated");
            accepted
        });
        if let Some(candidate) = winner {
            debug!(registry = %self.name, key = %candidate.key, ?subject, "candidate selected");
        }
        winner
    }

    /// Like [`find_first_match`](Self::find_first_match) but at least one
    /// match is required.
    pub fn select_first_match(
        &self,
        subject: &S,
        probe: &CapabilityProbe,
    ) -> Result<&Candidate<S, I>, NoMatchError> {
        self.find_first_match(subject, probe)
            .ok_or_else(|| self.no_match(subject))
    }

    /// Every candidate whose guard accepts `subject`, in registration order.
    pub fn select_all_matches(
        &self,
        subject: &S,
        probe: &CapabilityProbe,
        requirement: MatchRequirement,
    ) -> Result<Vec<&Candidate<S, I>>, NoMatchError> {
        let matches: Vec<_> = self
            .candidates
            .iter()
            .filter(|c| c.accepts(subject, probe))
            .collect();
        debug!(
            registry = %self.name,
            matched = ?matches.iter().map(|c| c.key.as_str()).collect::<Vec<_>>(),
            "all-matches selection"
        );
        if matches.is_empty() && requirement == MatchRequirement::AtLeastOne {
            return Err(self.no_match(subject));
        }
        Ok(matches)
    }

    fn no_match(&self, subject: &S) -> NoMatchError {
        NoMatchError {
            target: self.name.clone(),
            subject: format!("{subject:?}"),
            evaluated: self
                .candidates
                .iter()
                .map(|c| EvaluatedGuard {
                    key: c.key.clone(),
                    guard: c.describe_guard(),
                })
                .collect(),
        }
    }
}
