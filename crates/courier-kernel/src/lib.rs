//! Capability-gated strategy resolution.
//!
//! Implementations register as guarded candidates; at call time the guards
//! are evaluated against the runtime environment and the concrete subject to
//! pick one implementation, every accepting implementation, or a fallback
//! sequence.
//!
//! ```
//! use courier_kernel::{Candidate, Environment, Registry};
//! use courier_kernel::conditions::*;
//!
//! let probe = Environment::default().with_component("smtp").into_probe();
//!
//! let mut senders: Registry<String, &str> = Registry::new("email-senders");
//! senders.register(Candidate::guarded("smtp", type_present("smtp"), "smtp sender"));
//! senders.register(Candidate::guarded("sendgrid", type_present("sendgrid"), "sendgrid sender"));
//!
//! let winner = senders.select_first_match(&"hello".to_string(), &probe).unwrap();
//! assert_eq!(winner.key(), "smtp");
//! ```

// capability probe
pub mod probe;
pub use probe::{CapabilityFact, CapabilityProbe, CapabilitySource, FactKind};

// condition algebra
pub mod condition;
pub use condition::{Condition, Predicate, ValuePattern, conditions};

// declarative requirements
pub mod requirement;
pub use requirement::{
    RequiredComponent, RequiredProperty, Requirements, ResolvedProperty, ValueConstraint, compile_all,
};

// candidate registry and selection
pub mod registry;
pub use registry::{Candidate, EvaluatedGuard, MatchRequirement, NoMatchError, Registry, RuntimeGuard};

// invocation-time detection
pub mod dispatch;
pub use dispatch::{Detected, DetectingDispatcher};

// failure-gated fallback
pub mod fallback;
pub use fallback::{AllCandidatesFailedError, AttemptError, BoxError, FailedAttempt, FallbackExecutor, Succeeded};

// per-consumer adapters
pub mod adapter;
pub use adapter::{AdapterTable, MisconfiguredAdapterError};

// property sources
pub mod properties;
pub use properties::{EnvPropertySource, MapPropertySource, PropertyError, PropertyResolver, PropertySource};

// runtime environment
pub mod environment;
pub use environment::{ComponentCatalog, ConfigurationValue, Environment};

// configuration loading
#[cfg(feature = "config")]
pub mod config;
#[cfg(feature = "config")]
pub use properties::ConfigPropertySource;

// error module
pub mod error;
pub use error::{IntoKernelReport, KernelError, KernelResult};
