//! MIME type detection with provider fallback.

use courier_kernel::{AllCandidatesFailedError, AttemptError, FallbackExecutor};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MimeType(String);

impl MimeType {
    pub fn new(essence: impl Into<String>) -> Self {
        Self(essence.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the slash, e.g. `image`.
    pub fn primary(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MimeTypeError {
    /// One provider could not tell.
    #[error("{provider} could not detect the mime type of {input}")]
    Undetected { provider: String, input: String },

    /// No provider could tell.
    #[error("no mime type provider could detect the mime type: {0}")]
    NoProvider(#[from] AllCandidatesFailedError),
}

pub trait MimeTypeProvider: Send + Sync {
    fn name(&self) -> &str;

    fn from_bytes(&self, content: &[u8]) -> Result<MimeType, MimeTypeError>;

    fn from_file_name(&self, file_name: &str) -> Result<MimeType, MimeTypeError>;
}

fn undetected(provider: &str, input: impl fmt::Display) -> MimeTypeError {
    MimeTypeError::Undetected {
        provider: provider.to_string(),
        input: input.to_string(),
    }
}

// ─── Providers ──────────────────────────────────────────────────────────────

/// Recognises a content signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicBytesProvider;

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
];

impl MimeTypeProvider for MagicBytesProvider {
    fn name(&self) -> &str {
        "magic-bytes"
    }

    fn from_bytes(&self, content: &[u8]) -> Result<MimeType, MimeTypeError> {
        SIGNATURES
            .iter()
            .find(|(signature, _)| content.starts_with(signature))
            .map(|(_, mime)| MimeType::new(*mime))
            .ok_or_else(|| undetected(self.name(), format_args!("{} bytes", content.len())))
    }

    fn from_file_name(&self, file_name: &str) -> Result<MimeType, MimeTypeError> {
        let content = std::fs::read(file_name).map_err(|_| undetected(self.name(), file_name))?;
        self.from_bytes(&content)
    }
}

/// Maps file extensions to MIME types.
#[derive(Debug, Clone)]
pub struct ExtensionProvider {
    table: HashMap<String, MimeType>,
}

impl Default for ExtensionProvider {
    fn default() -> Self {
        let table = [
            ("html", "text/html"),
            ("htm", "text/html"),
            ("txt", "text/plain"),
            ("css", "text/css"),
            ("json", "application/json"),
            ("pdf", "application/pdf"),
            ("zip", "application/zip"),
            ("png", "image/png"),
            ("jpg", "image/jpeg"),
            ("jpeg", "image/jpeg"),
            ("gif", "image/gif"),
        ]
        .into_iter()
        .map(|(ext, mime)| (ext.to_string(), MimeType::new(mime)))
        .collect();
        Self { table }
    }
}

impl ExtensionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, extension: impl Into<String>, mime: impl Into<String>) -> Self {
        self.table.insert(extension.into(), MimeType::new(mime));
        self
    }
}

impl MimeTypeProvider for ExtensionProvider {
    fn name(&self) -> &str {
        "extension"
    }

    fn from_bytes(&self, content: &[u8]) -> Result<MimeType, MimeTypeError> {
        Err(undetected(self.name(), format_args!("{} bytes", content.len())))
    }

    fn from_file_name(&self, file_name: &str) -> Result<MimeType, MimeTypeError> {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.table.get(&ext.to_ascii_lowercase()))
            .cloned()
            .ok_or_else(|| undetected(self.name(), file_name))
    }
}

/// Always answers the same type.
#[derive(Debug, Clone)]
pub struct FixedProvider(pub MimeType);

impl MimeTypeProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    fn from_bytes(&self, _content: &[u8]) -> Result<MimeType, MimeTypeError> {
        Ok(self.0.clone())
    }

    fn from_file_name(&self, _file_name: &str) -> Result<MimeType, MimeTypeError> {
        Ok(self.0.clone())
    }
}

// ─── Fallback ───────────────────────────────────────────────────────────────

/// Asks each provider in turn until one detects a type.
pub struct FallbackMimeTypeProvider {
    executor: FallbackExecutor<Arc<dyn MimeTypeProvider>>,
}

impl Default for FallbackMimeTypeProvider {
    fn default() -> Self {
        Self::new()
            .with_provider(MagicBytesProvider)
            .with_provider(ExtensionProvider::default())
    }
}

impl FallbackMimeTypeProvider {
    pub fn new() -> Self {
        Self {
            executor: FallbackExecutor::new("mime-type-providers"),
        }
    }

    pub fn with_provider(mut self, provider: impl MimeTypeProvider + 'static) -> Self {
        let provider: Arc<dyn MimeTypeProvider> = Arc::new(provider);
        self.executor.push(provider.name().to_string(), provider);
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.executor.keys()
    }

    fn detect(
        &self,
        input: &str,
        attempt: impl Fn(&dyn MimeTypeProvider) -> Result<MimeType, MimeTypeError>,
    ) -> Result<MimeType, MimeTypeError> {
        let detected = self.executor.execute_with_fallback(|provider| {
            attempt(provider.as_ref()).map_err(|error| match error {
                MimeTypeError::Undetected { .. } => AttemptError::declined(error.to_string()),
                other => AttemptError::failed(other),
            })
        })?;
        debug!(input, provider = %detected.candidate, mime = %detected.value, "mime type detected");
        Ok(detected.value)
    }
}

impl MimeTypeProvider for FallbackMimeTypeProvider {
    fn name(&self) -> &str {
        self.executor.name()
    }

    fn from_bytes(&self, content: &[u8]) -> Result<MimeType, MimeTypeError> {
        self.detect(&format!("{} bytes", content.len()), |p| p.from_bytes(content))
    }

    fn from_file_name(&self, file_name: &str) -> Result<MimeType, MimeTypeError> {
        self.detect(file_name, |p| p.from_file_name(file_name))
    }
}

impl fmt::Debug for FallbackMimeTypeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackMimeTypeProvider")
            .field("providers", &self.provider_names())
            .finish()
    }
}
