//! Crate-level error types for `courier-foundation`.
//!
//! [`FoundationError`] gathers the errors of every strategy family and the
//! kernel, so the messaging facade can report any of them through one
//! [`error_stack::Report`].

use crate::mimetype::MimeTypeError;
use crate::resource::ResourceError;
use crate::sender::SendError;
use crate::template::TemplateError;
use crate::variant::VariantError;
use courier_kernel::error::KernelError;
use error_stack::Report;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FoundationError {
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Variant error: {0}")]
    Variant(#[from] VariantError),

    #[error("Mime type error: {0}")]
    MimeType(#[from] MimeTypeError),

    /// The messaging setup itself is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// `Result<T, error_stack::Report<FoundationError>>`.
pub type FoundationResult<T> = Result<T, Report<FoundationError>>;

/// Convert a result carrying any foundation sub-error into [`FoundationResult<T>`].
pub trait IntoFoundationReport<T> {
    fn into_report(self) -> FoundationResult<T>;
}

impl<T, E: Into<FoundationError>> IntoFoundationReport<T> for Result<T, E> {
    #[inline]
    fn into_report(self) -> FoundationResult<T> {
        self.map_err(|e| Report::new(e.into()))
    }
}
