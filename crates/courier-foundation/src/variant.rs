//! Content-variant resolution.
//!
//! A template may exist in several variants (an HTML body, a plain-text
//! body). Each [`VariantResolver`] proposes the path where a variant would
//! live; [`FirstExistingVariantResolver`] keeps the first proposal that
//! actually exists.

use crate::resource::{FirstSupportingResourceResolver, ResourcePath};
use courier_kernel::conditions::from_fn;
use courier_kernel::{Candidate, CapabilityProbe, Registry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Html,
    Text,
    Custom(String),
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Html => f.write_str("html"),
            Variant::Text => f.write_str("text"),
            Variant::Custom(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRequest {
    pub template: ResourcePath,
    pub variant: Variant,
}

impl VariantRequest {
    pub fn new(template: impl Into<ResourcePath>, variant: Variant) -> Self {
        Self {
            template: template.into(),
            variant,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VariantError {
    #[error("no {variant} variant of '{template}' (tested: [{}])", .tested_paths.join(", "))]
    NotFound {
        template: String,
        variant: Variant,
        tested_paths: Vec<String>,
    },
}

pub trait VariantResolver: Send + Sync {
    fn name(&self) -> &str;

    /// Where the requested variant would live, if this resolver handles it.
    fn candidate_path(&self, request: &VariantRequest) -> Option<ResourcePath>;
}

/// Appends a per-variant extension to the template path.
#[derive(Debug, Clone)]
pub struct ExtensionVariantResolver {
    name: String,
    extensions: HashMap<Variant, String>,
}

impl ExtensionVariantResolver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: HashMap::new(),
        }
    }

    pub fn with_extension(mut self, variant: Variant, extension: impl Into<String>) -> Self {
        self.extensions.insert(variant, extension.into());
        self
    }

    pub fn from_extensions(name: impl Into<String>, extensions: HashMap<Variant, String>) -> Self {
        Self {
            name: name.into(),
            extensions,
        }
    }
}

impl VariantResolver for ExtensionVariantResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn candidate_path(&self, request: &VariantRequest) -> Option<ResourcePath> {
        let extension = self.extensions.get(&request.variant)?;
        let template = &request.template;
        Some(template.with_path(format!("{}{extension}", template.path())))
    }
}

/// First proposed path that exists wins.
pub struct FirstExistingVariantResolver {
    registry: Registry<VariantRequest, Arc<dyn VariantResolver>>,
    resources: Arc<FirstSupportingResourceResolver>,
    probe: CapabilityProbe,
}

impl FirstExistingVariantResolver {
    pub fn new(resources: Arc<FirstSupportingResourceResolver>) -> Self {
        Self {
            registry: Registry::new("variant-resolvers"),
            resources,
            probe: CapabilityProbe::empty(),
        }
    }

    pub fn with_resolver(mut self, resolver: impl VariantResolver + 'static) -> Self {
        self.add(Arc::new(resolver));
        self
    }

    pub fn add(&mut self, resolver: Arc<dyn VariantResolver>) {
        let key = resolver.name().to_string();
        let proposer = resolver.clone();
        let resources = self.resources.clone();
        let guard = from_fn(format!("exists({key})"), move |request: &VariantRequest| {
            proposer
                .candidate_path(request)
                .is_some_and(|path| resources.exists(&path))
        });
        self.registry.register(Candidate::guarded(key, guard, resolver));
    }

    pub fn resolve(&self, request: &VariantRequest) -> Result<ResourcePath, VariantError> {
        let found = self
            .registry
            .find_first_match(request, &self.probe)
            .and_then(|candidate| candidate.implementation().candidate_path(request));

        match found {
            Some(path) => {
                debug!(template = %request.template, variant = %request.variant, %path, "variant found");
                Ok(path)
            }
            None => Err(VariantError::NotFound {
                template: request.template.to_string(),
                variant: request.variant.clone(),
                tested_paths: self
                    .registry
                    .iter()
                    .filter_map(|c| c.implementation().candidate_path(request))
                    .map(|path| path.to_string())
                    .collect(),
            }),
        }
    }
}

impl fmt::Debug for FirstExistingVariantResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirstExistingVariantResolver")
            .field("resolvers", &self.registry.keys())
            .finish()
    }
}
