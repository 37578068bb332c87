//! Failure-gated fallback.
//!
//! A [`FallbackExecutor`] holds an ordered list of implementations with no
//! guards. Execution tries each one in turn and stops at the first success.
//! A failed attempt moves on to the next candidate; only when every candidate
//! has failed is an [`AllCandidatesFailedError`] returned, carrying every
//! attempt's cause in order.
//!
//! Candidates report failure through [`AttemptError`], which separates a
//! deliberate decline from a real failure. Both continue the sequence, but a
//! failure is logged at `warn` and a decline at `debug`.

use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Boxed error accepted as a failure cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a single attempt did not succeed.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The candidate chose not to handle the invocation.
    #[error("declined: {0}")]
    Declined(String),

    /// The candidate tried and broke.
    #[error("failed: {0}")]
    Failed(BoxError),
}

impl AttemptError {
    pub fn declined(reason: impl Into<String>) -> Self {
        Self::Declined(reason.into())
    }

    pub fn failed(cause: impl Into<BoxError>) -> Self {
        Self::Failed(cause.into())
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Declined(_))
    }
}

/// One unsuccessful attempt.
#[derive(Debug)]
pub struct FailedAttempt {
    /// Position of the candidate in the executor.
    pub index: usize,
    pub candidate: String,
    pub cause: AttemptError,
}

impl fmt::Display for FailedAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: {}", self.index, self.candidate, self.cause)
    }
}

/// Every candidate of an executor failed.
#[derive(Debug, Error)]
#[error("all {} candidates of '{executor}' failed: [{}]", .attempts.len(), format_attempts(.attempts))]
pub struct AllCandidatesFailedError {
    pub executor: String,
    /// Attempts in the order they were made.
    pub attempts: Vec<FailedAttempt>,
}

fn format_attempts(attempts: &[FailedAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The attempt that succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Succeeded<R> {
    pub index: usize,
    pub candidate: String,
    pub value: R,
}

/// Ordered list of implementations tried until one succeeds.
pub struct FallbackExecutor<I> {
    name: String,
    candidates: Vec<(String, I)>,
}

impl<I> FallbackExecutor<I> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: Vec::new(),
        }
    }

    pub fn with_candidate(mut self, key: impl Into<String>, implementation: I) -> Self {
        self.push(key, implementation);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, implementation: I) {
        self.candidates.push((key.into(), implementation));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> Vec<&str> {
        self.candidates.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Run `attempt` against each candidate until one returns `Ok`.
    ///
    /// An executor without candidates fails with zero recorded attempts.
    pub fn execute_with_fallback<R>(
        &self,
        mut attempt: impl FnMut(&I) -> Result<R, AttemptError>,
    ) -> Result<Succeeded<R>, AllCandidatesFailedError> {
        let mut attempts = Vec::new();

        for (index, (key, implementation)) in self.candidates.iter().enumerate() {
            match attempt(implementation) {
                Ok(value) => {
                    debug!(executor = %self.name, candidate = %key, index, "attempt succeeded");
                    return Ok(Succeeded {
                        index,
                        candidate: key.clone(),
                        value,
                    });
                }
                Err(cause) => {
                    if cause.is_declined() {
                        debug!(executor = %self.name, candidate = %key, index, %cause, "attempt declined, trying next");
                    } else {
                        warn!(executor = %self.name, candidate = %key, index, %cause, "attempt failed, trying next");
                    }
                    attempts.push(FailedAttempt {
                        index,
                        candidate: key.clone(),
                        cause,
                    });
                }
            }
        }

        warn!(executor = %self.name, attempts = attempts.len(), "all candidates failed");
        Err(AllCandidatesFailedError {
            executor: self.name.clone(),
            attempts,
        })
    }
}

impl<I> fmt::Debug for FallbackExecutor<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackExecutor")
            .field("name", &self.name)
            .field("candidates", &self.keys())
            .finish()
    }
}
