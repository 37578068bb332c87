//! Per-consumer adapter table.
//!
//! A consumer (for example a content-variant resolver) may need an artifact
//! that only an adapter specific to the selected candidate can produce. The
//! table maps candidate keys to those adapters. A selected candidate without
//! an adapter is a configuration error, distinct from "nothing matched".

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// A candidate was selected but the consumer has no adapter for it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{consumer}' has no adapter for candidate '{candidate}'")]
pub struct MisconfiguredAdapterError {
    pub consumer: String,
    pub candidate: String,
}

pub struct AdapterTable<A> {
    consumer: String,
    adapters: HashMap<String, A>,
}

impl<A> AdapterTable<A> {
    pub fn new(consumer: impl Into<String>) -> Self {
        Self {
            consumer: consumer.into(),
            adapters: HashMap::new(),
        }
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    /// Register the adapter for `candidate_key`, replacing any earlier one.
    pub fn register(&mut self, candidate_key: impl Into<String>, adapter: A) -> &mut Self {
        let candidate_key = candidate_key.into();
        debug!(consumer = %self.consumer, candidate = %candidate_key, "adapter registered");
        self.adapters.insert(candidate_key, adapter);
        self
    }

    pub fn contains(&self, candidate_key: &str) -> bool {
        self.adapters.contains_key(candidate_key)
    }

    pub fn adapt(&self, candidate_key: &str) -> Result<&A, MisconfiguredAdapterError> {
        self.adapters
            .get(candidate_key)
            .ok_or_else(|| MisconfiguredAdapterError {
                consumer: self.consumer.clone(),
                candidate: candidate_key.to_string(),
            })
    }
}

impl<A> fmt::Debug for AdapterTable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.adapters.keys().collect();
        keys.sort();
        f.debug_struct("AdapterTable")
            .field("consumer", &self.consumer)
            .field("candidates", &keys)
            .finish()
    }
}
