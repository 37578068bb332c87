//! Declarative requirements compiled into [`Condition`] trees.
//!
//! An implementation declares what it needs to run:
//!
//! - components that must be present, each with alternatives (any one is
//!   enough) and excludes (none may be present);
//! - configuration keys that must resolve, with the same alternatives and
//!   excludes, optionally constrained to an exact value or a pattern.
//!
//! Compilation of a single component or property follows one fixed shape:
//!
//! ```text
//! and( or(present(primary), present(alt1), ..., present(altN)),
//!      not(or(present(excl1), ..., present(exclM))) )
//! ```
//!
//! A [`Requirements`] block ANDs the plain names first, then every compiled
//! component, then every compiled property. An empty block compiles to
//! `always_true()`. Several blocks attached to one candidate are ANDed by
//! [`compile_all`].

use crate::condition::conditions::*;
use crate::probe::CapabilityProbe;
use serde::{Deserialize, Serialize};

/// A component the implementation needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredComponent {
    pub name: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl RequiredComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_alternatives<I, T>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.alternatives.extend(alternatives.into_iter().map(Into::into));
        self
    }

    pub fn with_excludes<I, T>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.excludes.extend(excludes.into_iter().map(Into::into));
        self
    }

    pub fn compile<S>(&self) -> Condition<S> {
        let accepted = std::iter::once(&self.name)
            .chain(&self.alternatives)
            .map(|name| type_present(name.as_str()));
        let excluded = self.excludes.iter().map(|name| type_present(name.as_str()));
        and([or(accepted), not(or(excluded))])
    }
}

/// Constraint on the value of a required property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueConstraint {
    Equals(String),
    Matches(String),
}

/// A configuration key the implementation needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredProperty {
    pub key: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub constraint: Option<ValueConstraint>,
}

/// Value picked for a [`RequiredProperty`]: the first declared key that
/// resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProperty {
    pub key: String,
    pub value: String,
}

impl RequiredProperty {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_alternatives<I, T>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.alternatives.extend(alternatives.into_iter().map(Into::into));
        self
    }

    pub fn with_excludes<I, T>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.excludes.extend(excludes.into_iter().map(Into::into));
        self
    }

    pub fn equal_to(mut self, value: impl Into<String>) -> Self {
        self.constraint = Some(ValueConstraint::Equals(value.into()));
        self
    }

    pub fn matching(mut self, pattern: impl Into<String>) -> Self {
        self.constraint = Some(ValueConstraint::Matches(pattern.into()));
        self
    }

    /// Primary key followed by alternatives, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.key.as_str()).chain(self.alternatives.iter().map(String::as_str))
    }

    /// Compile into a condition. Fails only on an invalid pattern.
    pub fn compile<S>(&self) -> Result<Condition<S>, regex::Error> {
        let accepted = self
            .keys()
            .map(|key| self.leaf(key))
            .collect::<Result<Vec<_>, _>>()?;
        let excluded = self.excludes.iter().map(|key| config_present(key.as_str()));
        Ok(and([or(accepted), not(or(excluded))]))
    }

    fn leaf<S>(&self, key: &str) -> Result<Condition<S>, regex::Error> {
        match &self.constraint {
            None => Ok(config_present(key)),
            Some(ValueConstraint::Equals(value)) => Ok(config_equals(key, value.as_str())),
            Some(ValueConstraint::Matches(pattern)) => config_matches(key, pattern),
        }
    }

    /// First-declared-wins value resolution.
    ///
    /// The compiled condition only reports presence; the value an
    /// implementation should use comes from the first key that resolves.
    pub fn resolve(&self, probe: &CapabilityProbe) -> Option<ResolvedProperty> {
        self.keys().find_map(|key| {
            probe.config_value(key).map(|value| ResolvedProperty {
                key: key.to_owned(),
                value,
            })
        })
    }
}

/// Everything one implementation declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    /// Plain component names, each required as-is.
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub component_specs: Vec<RequiredComponent>,
    /// Plain configuration keys, each required as-is.
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub property_specs: Vec<RequiredProperty>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component(mut self, name: impl Into<String>) -> Self {
        self.components.push(name.into());
        self
    }

    pub fn component_spec(mut self, spec: RequiredComponent) -> Self {
        self.component_specs.push(spec);
        self
    }

    pub fn property(mut self, key: impl Into<String>) -> Self {
        self.properties.push(key.into());
        self
    }

    pub fn property_spec(mut self, spec: RequiredProperty) -> Self {
        self.property_specs.push(spec);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
            && self.component_specs.is_empty()
            && self.properties.is_empty()
            && self.property_specs.is_empty()
    }

    pub fn compile<S>(&self) -> Result<Condition<S>, regex::Error> {
        if self.is_empty() {
            return Ok(always_true());
        }
        let mut terms: Vec<Condition<S>> = Vec::new();
        terms.extend(self.components.iter().map(|n| type_present(n.as_str())));
        terms.extend(self.component_specs.iter().map(RequiredComponent::compile));
        terms.extend(self.properties.iter().map(|k| config_present(k.as_str())));
        for spec in &self.property_specs {
            terms.push(spec.compile()?);
        }
        Ok(and(terms))
    }

    /// First-declared-wins value for a declared property, looked up by
    /// its primary key.
    pub fn resolve_property(&self, key: &str, probe: &CapabilityProbe) -> Option<ResolvedProperty> {
        self.property_specs
            .iter()
            .find(|spec| spec.key == key)
            .and_then(|spec| spec.resolve(probe))
    }
}

/// Compile several requirement blocks and AND them.
///
/// No blocks, or only empty blocks, compile to `always_true()`.
pub fn compile_all<S>(blocks: &[Requirements]) -> Result<Condition<S>, regex::Error> {
    let compiled = blocks
        .iter()
        .filter(|block| !block.is_empty())
        .map(Requirements::compile)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(match compiled.len() {
        0 => always_true(),
        1 => compiled.into_iter().next().unwrap_or_else(always_true),
        _ => and(compiled),
    })
}
