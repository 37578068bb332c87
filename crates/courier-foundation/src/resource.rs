//! Resource resolution.
//!
//! A resource path may carry a lookup prefix naming where it lives:
//!
//! | Prefix | Lookup |
//! |---|---|
//! | `classpath:` | resources embedded in the application |
//! | `file:` | the filesystem |
//! | `string:`, `s:` | the path itself is the content |
//!
//! A [`FirstSupportingResourceResolver`] keeps one resolver per lookup in a
//! kernel registry and picks the first resolver supporting the path's lookup.
//! Paths without a prefix use the default lookup.

use courier_kernel::conditions::from_fn;
use courier_kernel::{Candidate, CapabilityProbe, NoMatchError, Registry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResourceError {
    #[error("resource '{path}' not found")]
    NotFound { path: String },

    #[error("failed to read resource '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("resource '{path}' is not valid UTF-8")]
    InvalidUtf8 { path: String },

    #[error("no resolver for resource: {0}")]
    NoResolver(#[from] NoMatchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    Classpath,
    File,
    String,
}

impl Lookup {
    /// Canonical prefix, including the colon.
    pub fn prefix(self) -> &'static str {
        match self {
            Lookup::Classpath => "classpath:",
            Lookup::File => "file:",
            Lookup::String => "string:",
        }
    }

    fn split(path: &str) -> (Option<Lookup>, &str) {
        const PREFIXES: [(&str, Lookup); 4] = [
            ("classpath:", Lookup::Classpath),
            ("file:", Lookup::File),
            ("string:", Lookup::String),
            ("s:", Lookup::String),
        ];
        PREFIXES
            .iter()
            .find_map(|(prefix, lookup)| path.strip_prefix(prefix).map(|rest| (Some(*lookup), rest)))
            .unwrap_or((None, path))
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches(':'))
    }
}

/// A parsed resource location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    original: String,
    lookup: Option<Lookup>,
    path: String,
}

impl ResourcePath {
    pub fn parse(original: impl Into<String>) -> Self {
        let original = original.into();
        let (lookup, path) = Lookup::split(&original);
        let path = path.to_string();
        Self {
            original,
            lookup,
            path,
        }
    }

    pub fn lookup(&self) -> Option<Lookup> {
        self.lookup
    }

    /// Path without its lookup prefix.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path as originally written.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Same path with `lookup` when none was written.
    pub fn or_lookup(&self, lookup: Option<Lookup>) -> Self {
        match (self.lookup, lookup) {
            (None, Some(lookup)) => Self {
                original: format!("{}{}", lookup.prefix(), self.path),
                lookup: Some(lookup),
                path: self.path.clone(),
            },
            _ => self.clone(),
        }
    }

    /// Same lookup, different path.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        let path = path.into();
        let original = match self.lookup {
            Some(lookup) => format!("{}{path}", lookup.prefix()),
            None => path.clone(),
        };
        Self {
            original,
            lookup: self.lookup,
            path,
        }
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl From<&str> for ResourcePath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

/// Loaded resource content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub path: ResourcePath,
    pub content: Vec<u8>,
}

impl Resource {
    pub fn as_text(&self) -> Result<&str, ResourceError> {
        std::str::from_utf8(&self.content).map_err(|_| ResourceError::InvalidUtf8 {
            path: self.path.to_string(),
        })
    }
}

pub trait ResourceResolver: Send + Sync {
    fn name(&self) -> &str;

    /// Lookups this resolver serves.
    fn lookups(&self) -> &[Lookup];

    fn resolve(&self, path: &ResourcePath) -> Result<Resource, ResourceError>;

    fn exists(&self, path: &ResourcePath) -> bool {
        self.resolve(path).is_ok()
    }

    /// Whether parent path and extension settings apply to this resolver.
    fn relativisable(&self) -> bool {
        true
    }
}

// ─── Resolvers ──────────────────────────────────────────────────────────────

/// The path is the content.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringResolver;

impl ResourceResolver for StringResolver {
    fn name(&self) -> &str {
        "string"
    }

    fn lookups(&self) -> &[Lookup] {
        &[Lookup::String]
    }

    fn resolve(&self, path: &ResourcePath) -> Result<Resource, ResourceError> {
        Ok(Resource {
            path: path.clone(),
            content: path.path().as_bytes().to_vec(),
        })
    }

    fn exists(&self, _path: &ResourcePath) -> bool {
        true
    }

    fn relativisable(&self) -> bool {
        false
    }
}

/// Files, optionally relative to a base directory.
#[derive(Debug, Clone, Default)]
pub struct FileResolver {
    base: Option<PathBuf>,
}

impl FileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    /// Under a base directory, absolute paths are taken relative to it.
    fn locate(&self, path: &ResourcePath) -> PathBuf {
        match &self.base {
            Some(base) => base.join(path.path().trim_start_matches('/')),
            None => PathBuf::from(path.path()),
        }
    }
}

impl ResourceResolver for FileResolver {
    fn name(&self) -> &str {
        "file"
    }

    fn lookups(&self) -> &[Lookup] {
        &[Lookup::File]
    }

    fn resolve(&self, path: &ResourcePath) -> Result<Resource, ResourceError> {
        let location = self.locate(path);
        let content = std::fs::read(&location).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ResourceError::NotFound {
                path: path.to_string(),
            },
            _ => ResourceError::Io {
                path: path.to_string(),
                source,
            },
        })?;
        debug!(path = %path, location = %location.display(), "file resource loaded");
        Ok(Resource {
            path: path.clone(),
            content,
        })
    }

    fn exists(&self, path: &ResourcePath) -> bool {
        self.locate(path).is_file()
    }
}

/// Resources bundled with the application.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedResolver {
    entries: BTreeMap<String, Vec<u8>>,
}

impl EmbeddedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let path: String = path.into();
        self.entries
            .insert(path.trim_start_matches('/').to_string(), content.into());
        self
    }

    fn key(path: &ResourcePath) -> &str {
        path.path().trim_start_matches('/')
    }
}

impl ResourceResolver for EmbeddedResolver {
    fn name(&self) -> &str {
        "classpath"
    }

    fn lookups(&self) -> &[Lookup] {
        &[Lookup::Classpath]
    }

    fn resolve(&self, path: &ResourcePath) -> Result<Resource, ResourceError> {
        self.entries
            .get(Self::key(path))
            .map(|content| Resource {
                path: path.clone(),
                content: content.clone(),
            })
            .ok_or_else(|| ResourceError::NotFound {
                path: path.to_string(),
            })
    }

    fn exists(&self, path: &ResourcePath) -> bool {
        self.entries.contains_key(Self::key(path))
    }
}

/// Applies a parent path and an extension before delegating.
pub struct RelativeResolver {
    inner: Arc<dyn ResourceResolver>,
    parent_path: String,
    extension: String,
}

impl RelativeResolver {
    pub fn new(inner: Arc<dyn ResourceResolver>, parent_path: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            inner,
            parent_path: parent_path.into(),
            extension: extension.into(),
        }
    }

    pub fn relativize(&self, path: &ResourcePath) -> ResourcePath {
        let mut full = String::with_capacity(self.parent_path.len() + path.path().len() + self.extension.len());
        full.push_str(&self.parent_path);
        full.push_str(path.path());
        if !full.ends_with(&self.extension) {
            full.push_str(&self.extension);
        }
        path.with_path(full)
    }
}

impl ResourceResolver for RelativeResolver {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn lookups(&self) -> &[Lookup] {
        self.inner.lookups()
    }

    fn resolve(&self, path: &ResourcePath) -> Result<Resource, ResourceError> {
        self.inner.resolve(&self.relativize(path))
    }

    fn exists(&self, path: &ResourcePath) -> bool {
        self.inner.exists(&self.relativize(path))
    }

    fn relativisable(&self) -> bool {
        false
    }
}

// ─── Selection ──────────────────────────────────────────────────────────────

/// Delegates to the first resolver that supports the path's lookup.
pub struct FirstSupportingResourceResolver {
    registry: Registry<ResourcePath, Arc<dyn ResourceResolver>>,
    default_lookup: Option<Lookup>,
    probe: CapabilityProbe,
}

impl FirstSupportingResourceResolver {
    pub fn new(default_lookup: Option<Lookup>) -> Self {
        Self {
            registry: Registry::new("resource-resolvers"),
            default_lookup,
            probe: CapabilityProbe::empty(),
        }
    }

    pub fn add(&mut self, resolver: Arc<dyn ResourceResolver>) {
        let lookups = resolver.lookups().to_vec();
        let label = lookups.iter().map(ToString::to_string).collect::<Vec<_>>().join("|");
        let guard = from_fn(format!("lookup({label})"), move |path: &ResourcePath| {
            path.lookup().is_some_and(|lookup| lookups.contains(&lookup))
        });
        let key = resolver.name().to_string();
        self.registry.register(Candidate::guarded(key, guard, resolver));
    }

    pub fn default_lookup(&self) -> Option<Lookup> {
        self.default_lookup
    }

    pub fn resolver_names(&self) -> Vec<&str> {
        self.registry.keys()
    }

    /// Resolver for a path, after applying the default lookup.
    pub fn select(&self, path: &ResourcePath) -> Result<&dyn ResourceResolver, NoMatchError> {
        let effective = path.or_lookup(self.default_lookup);
        let candidate = self.registry.select_first_match(&effective, &self.probe)?;
        Ok(candidate.implementation().as_ref())
    }

    pub fn resolve(&self, path: &ResourcePath) -> Result<Resource, ResourceError> {
        let effective = path.or_lookup(self.default_lookup);
        self.select(&effective)?.resolve(&effective)
    }

    pub fn exists(&self, path: &ResourcePath) -> bool {
        let effective = path.or_lookup(self.default_lookup);
        self.select(&effective)
            .map(|resolver| resolver.exists(&effective))
            .unwrap_or(false)
    }
}

impl fmt::Debug for FirstSupportingResourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirstSupportingResourceResolver")
            .field("resolvers", &self.resolver_names())
            .field("default_lookup", &self.default_lookup)
            .finish()
    }
}

/// Assembles a [`FirstSupportingResourceResolver`].
#[derive(Default)]
pub struct ResourceResolutionBuilder {
    resolvers: Vec<Arc<dyn ResourceResolver>>,
    parent_path: Option<String>,
    extension: Option<String>,
    default_lookup: Option<Lookup>,
}

impl ResourceResolutionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    pub fn with_string(self) -> Self {
        self.with_resolver(StringResolver)
    }

    pub fn with_file(self, resolver: FileResolver) -> Self {
        self.with_resolver(resolver)
    }

    pub fn with_embedded(self, resolver: EmbeddedResolver) -> Self {
        self.with_resolver(resolver)
    }

    /// Prefix applied to every relativisable path.
    pub fn with_parent_path(mut self, parent_path: impl Into<String>) -> Self {
        self.parent_path = Some(parent_path.into());
        self
    }

    /// Suffix applied to every relativisable path.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Lookup used for paths written without a prefix.
    pub fn with_default_lookup(mut self, lookup: Lookup) -> Self {
        self.default_lookup = Some(lookup);
        self
    }

    pub fn build(self) -> FirstSupportingResourceResolver {
        let relative = self.parent_path.is_some() || self.extension.is_some();
        let parent_path = self.parent_path.unwrap_or_default();
        let extension = self.extension.unwrap_or_default();

        let mut resolver = FirstSupportingResourceResolver::new(self.default_lookup);
        for inner in self.resolvers {
            if relative && inner.relativisable() {
                resolver.add(Arc::new(RelativeResolver::new(inner, parent_path.clone(), extension.clone())));
            } else {
                resolver.add(inner);
            }
        }
        resolver
    }
}
