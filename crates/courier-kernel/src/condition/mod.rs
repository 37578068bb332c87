//! Condition algebra.
//!
//! A [`Condition`] is an immutable boolean expression evaluated against a
//! subject of type `S` (a message, an invocation, a resource path) and the
//! capability facts known to a [`CapabilityProbe`].
//!
//! ```text
//! and(or(type(smtp), type(smtp-legacy)), not(or(type(sendgrid))))
//!  │      │                                    │
//!  │      └── alternatives                     └── excludes
//!  └── short-circuits on the first false child
//! ```
//!
//! Composites short-circuit: `and` stops at the first `false`, `or` at the
//! first `true`. `and` of no children is `true` and `or` of no children is
//! `false`, so an empty list of alternatives or excludes compiles to the
//! neutral element.

use crate::probe::CapabilityProbe;
use regex::Regex;
use std::fmt;
use std::ops;
use std::sync::Arc;

pub mod conditions;
pub use conditions::*;


/// Boolean expression over a subject `S`.
pub enum Condition<S> {
    /// Constant answer.
    Fixed(bool),
    /// Every child accepts.
    And(Vec<Condition<S>>),
    /// At least one child accepts.
    Or(Vec<Condition<S>>),
    /// Negation.
    Not(Box<Condition<S>>),
    /// Named component is available.
    TypePresent(String),
    /// Configuration key has a value.
    ConfigPresent(String),
    /// Configuration key has exactly this value.
    ConfigEquals { key: String, value: String },
    /// Configuration key has a value matched in full by the pattern.
    ConfigMatches { key: String, pattern: ValuePattern },
    /// Arbitrary predicate over the subject.
    Custom(Predicate<S>),
}

impl<S> Condition<S> {
    /// Evaluate against a subject.
    ///
    /// Never mutates the subject. Given a fixed set of capability facts the
    /// answer is deterministic.
    pub fn accept(&self, subject: &S, probe: &CapabilityProbe) -> bool {
        match self {
            Condition::Fixed(value) => *value,
            Condition::And(children) => children.iter().all(|c| c.accept(subject, probe)),
            Condition::Or(children) => children.iter().any(|c| c.accept(subject, probe)),
            Condition::Not(inner) => !inner.accept(subject, probe),
            Condition::TypePresent(name) => probe.type_present(name),
            Condition::ConfigPresent(key) => probe.config_present(key),
            Condition::ConfigEquals { key, value } => probe
                .config_value(key)
                .is_some_and(|actual| actual == *value),
            Condition::ConfigMatches { key, pattern } => probe
                .config_value(key)
                .is_some_and(|actual| pattern.matches(&actual)),
            Condition::Custom(predicate) => predicate.test(subject),
        }
    }

    /// Whether this is the constant `true`.
    pub fn is_always_true(&self) -> bool {
        matches!(self, Condition::Fixed(true))
    }
}

impl<S> Clone for Condition<S> {
    fn clone(&self) -> Self {
        match self {
            Condition::Fixed(value) => Condition::Fixed(*value),
            Condition::And(children) => Condition::And(children.clone()),
            Condition::Or(children) => Condition::Or(children.clone()),
            Condition::Not(inner) => Condition::Not(inner.clone()),
            Condition::TypePresent(name) => Condition::TypePresent(name.clone()),
            Condition::ConfigPresent(key) => Condition::ConfigPresent(key.clone()),
            Condition::ConfigEquals { key, value } => Condition::ConfigEquals {
                key: key.clone(),
                value: value.clone(),
            },
            Condition::ConfigMatches { key, pattern } => Condition::ConfigMatches {
                key: key.clone(),
                pattern: pattern.clone(),
            },
            Condition::Custom(predicate) => Condition::Custom(predicate.clone()),
        }
    }
}

/// Structural equality. Custom predicates are equal only to themselves.
impl<S> PartialEq for Condition<S> {
    fn eq(&self, other: &Self) -> bool {
        use Condition::*;
        match (self, other) {
            (Fixed(a), Fixed(b)) => a == b,
            (And(a), And(b)) | (Or(a), Or(b)) => a == b,
            (Not(a), Not(b)) => a == b,
            (TypePresent(a), TypePresent(b)) | (ConfigPresent(a), ConfigPresent(b)) => a == b,
            (ConfigEquals { key: ka, value: va }, ConfigEquals { key: kb, value: vb }) => {
                ka == kb && va == vb
            }
            (ConfigMatches { key: ka, pattern: pa }, ConfigMatches { key: kb, pattern: pb }) => {
                ka == kb && pa == pb
            }
            (Custom(a), Custom(b)) => Arc::ptr_eq(&a.test, &b.test),
            _ => false,
        }
    }
}

impl<S> fmt::Display for Condition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<S>(f: &mut fmt::Formatter<'_>, op: &str, items: &[Condition<S>]) -> fmt::Result {
            write!(f, "{op}(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str(")")
        }

        match self {
            Condition::Fixed(value) => write!(f, "{value}"),
            Condition::And(children) => list(f, "and", children),
            Condition::Or(children) => list(f, "or", children),
            Condition::Not(inner) => write!(f, "not({inner})"),
            Condition::TypePresent(name) => write!(f, "type({name})"),
            Condition::ConfigPresent(key) => write!(f, "config({key})"),
            Condition::ConfigEquals { key, value } => write!(f, "config({key} == {value:?})"),
            Condition::ConfigMatches { key, pattern } => write!(f, "config({key} ~ /{pattern}/)"),
            Condition::Custom(predicate) => write!(f, "fn({})", predicate.name),
        }
    }
}

impl<S> fmt::Debug for Condition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<S> ops::BitAnd for Condition<S> {
    type Output = Condition<S>;

    fn bitand(self, rhs: Self) -> Self::Output {
        match self {
            Condition::And(mut children) => {
                children.push(rhs);
                Condition::And(children)
            }
            lhs => Condition::And(vec![lhs, rhs]),
        }
    }
}

impl<S> ops::BitOr for Condition<S> {
    type Output = Condition<S>;

    fn bitor(self, rhs: Self) -> Self::Output {
        match self {
            Condition::Or(mut children) => {
                children.push(rhs);
                Condition::Or(children)
            }
            lhs => Condition::Or(vec![lhs, rhs]),
        }
    }
}

impl<S> ops::Not for Condition<S> {
    type Output = Condition<S>;

    fn not(self) -> Self::Output {
        Condition::Not(Box::new(self))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Leaves
// ─────────────────────────────────────────────────────────────────────────────

/// Named predicate over a subject, shared by every clone of the condition.
pub struct Predicate<S> {
    name: String,
    test: Arc<dyn Fn(&S) -> bool + Send + Sync>,
}

impl<S> Predicate<S> {
    pub fn new(name: impl Into<String>, test: impl Fn(&S) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            test: Arc::new(test),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self, subject: &S) -> bool {
        (self.test)(subject)
    }
}

impl<S> Clone for Predicate<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            test: Arc::clone(&self.test),
        }
    }
}

/// Whole-value regular expression used by [`Condition::ConfigMatches`].
///
/// Keeps the pattern as written for display and equality; matching uses an
/// anchored compilation so `a|b` never accepts `ab`.
#[derive(Clone)]
pub struct ValuePattern {
    source: String,
    anchored: Regex,
}

impl ValuePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: pattern.to_owned(),
            anchored: Regex::new(&format!("^(?:{pattern})$"))?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, value: &str) -> bool {
        self.anchored.is_match(value)
    }
}

impl PartialEq for ValuePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for ValuePattern {}

impl fmt::Display for ValuePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl fmt::Debug for ValuePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValuePattern({:?})", self.source)
    }
}
