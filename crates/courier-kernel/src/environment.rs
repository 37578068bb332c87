//! Runtime environment backing the capability probe.
//!
//! An [`Environment`] pairs a [`ComponentCatalog`], the components linked into
//! this build, with a [`PropertyResolver`]. It is the production
//! [`CapabilitySource`]: component presence answers type checks and the
//! resolver answers configuration checks.

use crate::probe::{CapabilityProbe, CapabilitySource};
use crate::properties::{PropertyError, PropertyResolver, PropertySource};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{debug, warn};

/// Names of the components available at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentCatalog {
    components: BTreeSet<String>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, component: impl Into<String>) -> Self {
        self.register(component);
        self
    }

    pub fn register(&mut self, component: impl Into<String>) {
        self.components.insert(component.into());
    }

    pub fn contains(&self, component: &str) -> bool {
        self.components.contains(component)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ComponentCatalog {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            components: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Components plus layered properties.
#[derive(Debug, Default)]
pub struct Environment {
    catalog: ComponentCatalog,
    properties: PropertyResolver,
}

impl Environment {
    pub fn new(catalog: ComponentCatalog, properties: PropertyResolver) -> Self {
        Self {
            catalog,
            properties,
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.catalog.register(component);
        self
    }

    pub fn with_properties(mut self, source: impl PropertySource + 'static) -> Self {
        self.properties = self.properties.with_source(source);
        self
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    pub fn properties(&self) -> &PropertyResolver {
        &self.properties
    }

    /// Wrap the environment in a fresh probe.
    pub fn into_probe(self) -> CapabilityProbe {
        CapabilityProbe::from_source(self)
    }
}

impl CapabilitySource for Environment {
    fn type_loadable(&self, name: &str) -> bool {
        self.catalog.contains(name)
    }

    /// A key is present only when it evaluates to a value, so presence and
    /// value never disagree.
    fn has_config_value(&self, key: &str) -> bool {
        self.config_value(key).is_some()
    }

    /// An unresolvable placeholder makes the value absent.
    fn config_value(&self, key: &str) -> Option<String> {
        match self.properties.get(key) {
            Ok(value) => value,
            Err(error) => {
                warn!(key, %error, "property could not be evaluated");
                None
            }
        }
    }
}

// ─── Configuration values ───────────────────────────────────────────────────

/// A setting that may be given explicitly, read from properties, or defaulted.
///
/// Precedence: explicit value, then the first declared key that has a
/// value, then the default.
///
/// ```rust,ignore
/// let port = ConfigurationValue::<u16>::new()
///     .properties(["mail.smtp.port", "mail.port"])
///     .default_value(25)
///     .resolve(&probe)?;
/// ```
#[derive(Debug, Clone)]
pub struct ConfigurationValue<T> {
    keys: Vec<String>,
    explicit: Option<T>,
    default: Option<T>,
}

impl<T> Default for ConfigurationValue<T> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            explicit: None,
            default: None,
        }
    }
}

impl<T> ConfigurationValue<T>
where
    T: FromStr + Clone,
    T::Err: Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Property keys, in lookup order. Appends to earlier keys.
    pub fn properties<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn value(mut self, value: T) -> Self {
        self.explicit = Some(value);
        self
    }

    pub fn default_value(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn resolve(&self, probe: &CapabilityProbe) -> Result<Option<T>, PropertyError> {
        if let Some(value) = &self.explicit {
            return Ok(Some(value.clone()));
        }
        for key in &self.keys {
            if let Some(raw) = probe.config_value(key) {
                debug!(key, value = %raw, "configuration value from property");
                return raw.parse().map(Some).map_err(|e: T::Err| PropertyError::Invalid {
                    key: key.clone(),
                    value: raw.clone(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(self.default.clone())
    }
}
