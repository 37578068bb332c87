//! Crate-level error types for `courier-kernel`.
//!
//! [`KernelError`] composes the typed errors of every sub-module and is
//! carried in an [`error_stack::Report`] so builders can attach context as
//! the error travels up.
//!
//! ```rust,ignore
//! use courier_kernel::error::{IntoKernelReport, KernelResult};
//! use error_stack::ResultExt;
//!
//! fn sender_guard(requirements: &Requirements) -> KernelResult<Condition<Message>> {
//!     requirements
//!         .compile()
//!         .into_report()
//!         .attach("compiling requirements of the smtp sender")
//! }
//! ```

use crate::adapter::MisconfiguredAdapterError;
use crate::fallback::AllCandidatesFailedError;
use crate::properties::PropertyError;
use crate::registry::NoMatchError;
use error_stack::Report;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    /// No candidate accepted a subject that required one.
    #[error("No match: {0}")]
    NoMatch(#[from] NoMatchError),

    /// A fallback sequence ran out of candidates.
    #[error("Fallback exhausted: {0}")]
    AllCandidatesFailed(#[from] AllCandidatesFailedError),

    #[error("Misconfigured adapter: {0}")]
    MisconfiguredAdapter(#[from] MisconfiguredAdapterError),

    /// A configuration-related error (requires the `config` feature).
    #[cfg(feature = "config")]
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Property error: {0}")]
    Property(#[from] PropertyError),

    /// A value pattern in a requirement or condition did not compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("{0}")]
    Internal(String),
}

/// `Result<T, error_stack::Report<KernelError>>`.
pub type KernelResult<T> = Result<T, Report<KernelError>>;

/// Convert a result carrying any kernel sub-error into [`KernelResult<T>`].
pub trait IntoKernelReport<T> {
    /// Wrap the error in an `error_stack::Report`.
    fn into_report(self) -> KernelResult<T>;
}

impl<T, E: Into<KernelError>> IntoKernelReport<T> for Result<T, E> {
    #[inline]
    fn into_report(self) -> KernelResult<T> {
        self.map_err(|e| Report::new(e.into()))
    }
}
