//! Constructor functions for [`Condition`] trees.
//!
//! ```rust
//! use courier_kernel::condition::conditions::*;
//!
//! let guard: Condition<()> = and([
//!     or([type_present("smtp"), type_present("smtp-legacy")]),
//!     not(config_present("mail.disabled")),
//! ]);
//! assert_eq!(
//!     guard.to_string(),
//!     "and(or(type(smtp), type(smtp-legacy)), not(config(mail.disabled)))"
//! );
//! ```

pub use super::{Condition, Predicate, ValuePattern};

/// Every condition must accept. Empty input accepts.
pub fn and<S>(conditions: impl IntoIterator<Item = Condition<S>>) -> Condition<S> {
    Condition::And(conditions.into_iter().collect())
}

/// At least one condition must accept. Empty input rejects.
pub fn or<S>(conditions: impl IntoIterator<Item = Condition<S>>) -> Condition<S> {
    Condition::Or(conditions.into_iter().collect())
}

pub fn not<S>(condition: Condition<S>) -> Condition<S> {
    Condition::Not(Box::new(condition))
}

pub fn always_true<S>() -> Condition<S> {
    Condition::Fixed(true)
}

pub fn always_false<S>() -> Condition<S> {
    Condition::Fixed(false)
}

/// The named component is available.
pub fn type_present<S>(name: impl Into<String>) -> Condition<S> {
    Condition::TypePresent(name.into())
}

/// The configuration key resolves to a value.
pub fn config_present<S>(key: impl Into<String>) -> Condition<S> {
    Condition::ConfigPresent(key.into())
}

/// The configuration key resolves to exactly `value`.
pub fn config_equals<S>(key: impl Into<String>, value: impl Into<String>) -> Condition<S> {
    Condition::ConfigEquals {
        key: key.into(),
        value: value.into(),
    }
}

/// The configuration key resolves to a value matched in full by `pattern`.
pub fn config_matches<S>(key: impl Into<String>, pattern: &str) -> Result<Condition<S>, regex::Error> {
    Ok(Condition::ConfigMatches {
        key: key.into(),
        pattern: ValuePattern::new(pattern)?,
    })
}

/// Leaf backed by an arbitrary predicate over the subject.
pub fn from_fn<S>(
    name: impl Into<String>,
    test: impl Fn(&S) -> bool + Send + Sync + 'static,
) -> Condition<S> {
    Condition::Custom(Predicate::new(name, test))
}
