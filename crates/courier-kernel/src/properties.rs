//! Layered property sources.
//!
//! A [`PropertyResolver`] holds an ordered list of [`PropertySource`]s. For
//! each key the first source that holds it wins; later sources only fill
//! gaps. Sources are kept in a kernel [`Registry`] whose guards test whether
//! the source holds the requested key, so lookups go through the same
//! first-match selection as every other strategy family.
//!
//! Values may reference other properties with `${key}` and supply a fallback
//! with `${key:default}`.

use crate::condition::conditions::from_fn;
use crate::probe::CapabilityProbe;
use crate::registry::{Candidate, Registry};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::trace;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").expect("valid regex"));

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PropertyError {
    #[error("property '{key}' referenced by '{expression}' is not defined")]
    Unresolvable { key: String, expression: String },

    #[error("circular property reference: {}", .chain.join(" -> "))]
    Circular { chain: Vec<String> },

    #[error("property '{key}' has invalid value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// A named store of string properties.
pub trait PropertySource: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> Option<String>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

// ─── Sources ────────────────────────────────────────────────────────────────

/// In-memory properties.
#[derive(Debug, Clone, Default)]
pub struct MapPropertySource {
    name: String,
    values: BTreeMap<String, String>,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn from_map(name: impl Into<String>, values: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Process environment variables.
///
/// Key `mail.smtp-host` is read from `MAIL_SMTP_HOST`, or
/// `COURIER_MAIL_SMTP_HOST` with prefix `COURIER`.
#[derive(Debug, Clone, Default)]
pub struct EnvPropertySource {
    prefix: Option<String>,
}

impl EnvPropertySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Environment variable name a key is read from.
    pub fn variable_name(&self, key: &str) -> String {
        let name: String = key
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();
        match &self.prefix {
            Some(prefix) => format!("{}_{name}", prefix.to_ascii_uppercase()),
            None => name,
        }
    }
}

impl PropertySource for EnvPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}

/// A configuration file flattened into dotted keys.
#[cfg(feature = "config")]
#[derive(Debug, Clone)]
pub struct ConfigPropertySource {
    name: String,
    values: BTreeMap<String, String>,
}

#[cfg(feature = "config")]
impl ConfigPropertySource {
    /// Load a file in any supported format; the path is the source name.
    pub fn load(path: &str) -> crate::config::ConfigResult<Self> {
        Ok(Self {
            name: path.to_string(),
            values: crate::config::load_properties(path)?,
        })
    }

    pub fn from_content(
        name: impl Into<String>,
        content: &str,
        format: crate::config::Format,
    ) -> crate::config::ConfigResult<Self> {
        Ok(Self {
            name: name.into(),
            values: crate::config::properties_from_str(content, format)?,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

#[cfg(feature = "config")]
impl PropertySource for ConfigPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

// ─── Resolver ───────────────────────────────────────────────────────────────

/// Ordered property sources, first holder wins.
pub struct PropertyResolver {
    sources: Registry<String, Arc<dyn PropertySource>>,
    // source guards only inspect the requested key
    probe: CapabilityProbe,
}

impl Default for PropertyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyResolver {
    pub fn new() -> Self {
        Self {
            sources: Registry::new("property-sources"),
            probe: CapabilityProbe::empty(),
        }
    }

    pub fn with_source(mut self, source: impl PropertySource + 'static) -> Self {
        self.add_source(Arc::new(source));
        self
    }

    /// Append a source with the lowest precedence so far. A source whose
    /// name is already registered is ignored.
    pub fn add_source(&mut self, source: Arc<dyn PropertySource>) {
        let name = source.name().to_string();
        let holder = source.clone();
        let guard = from_fn(format!("holds({name})"), move |key: &String| holder.contains(key));
        self.sources.register(Candidate::guarded(name, guard, source));
    }

    /// Source names in precedence order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.keys()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.holder(key).is_some()
    }

    /// Name of the source that answers for `key`.
    pub fn source_of(&self, key: &str) -> Option<&str> {
        self.holder(key).map(|source| source.name())
    }

    /// Value as stored, without placeholder evaluation.
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.holder(key).and_then(|source| source.get(key))
    }

    /// Value with `${..}` placeholders evaluated.
    pub fn get(&self, key: &str) -> Result<Option<String>, PropertyError> {
        match self.get_raw(key) {
            Some(raw) => {
                let mut chain = vec![key.to_string()];
                self.evaluate_with(&raw, &mut chain).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Evaluate `${key}` and `${key:default}` references in `expression`.
    pub fn evaluate(&self, expression: &str) -> Result<String, PropertyError> {
        self.evaluate_with(expression, &mut Vec::new())
    }

    fn holder(&self, key: &str) -> Option<&Arc<dyn PropertySource>> {
        let found = self
            .sources
            .find_first_match(&key.to_string(), &self.probe)
            .map(Candidate::implementation);
        trace!(key, source = ?found.map(|s| s.name()), "property lookup");
        found
    }

    fn evaluate_with(&self, expression: &str, chain: &mut Vec<String>) -> Result<String, PropertyError> {
        let mut out = String::with_capacity(expression.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(expression) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&expression[last..whole.start()]);
            let key = caps[1].trim();

            let value = match self.get_raw(key) {
                Some(raw) => {
                    if chain.iter().any(|k| k == key) {
                        let mut cycle = chain.clone();
                        cycle.push(key.to_string());
                        return Err(PropertyError::Circular { chain: cycle });
                    }
                    chain.push(key.to_string());
                    let value = self.evaluate_with(&raw, chain)?;
                    chain.pop();
                    value
                }
                None => match caps.get(2) {
                    Some(default) => self.evaluate_with(default.as_str(), chain)?,
                    None => {
                        return Err(PropertyError::Unresolvable {
                            key: key.to_string(),
                            expression: expression.to_string(),
                        });
                    }
                },
            };

            out.push_str(&value);
            last = whole.end();
        }

        out.push_str(&expression[last..]);
        Ok(out)
    }
}

impl fmt::Debug for PropertyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyResolver")
            .field("sources", &self.source_names())
            .finish()
    }
}
