//! Content translation before sending.
//!
//! Translators turn message content into something a sender can deliver,
//! for instance rendering a template reference into text.

use crate::error::FoundationError;
use crate::message::Content;
use crate::resource::{FirstSupportingResourceResolver, ResourcePath};
use crate::template::{TemplateEngine, TemplateRequest};
use courier_kernel::conditions::from_fn;
use courier_kernel::error::KernelError;
use courier_kernel::{Candidate, CapabilityProbe, MatchRequirement, Registry};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

pub trait ContentTranslator: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, content: &Content) -> bool;

    fn translate(&self, content: Content) -> Result<Content, FoundationError>;
}

/// Renders template content into text.
pub struct TemplateContentTranslator {
    engine: Arc<TemplateEngine>,
    resources: Arc<FirstSupportingResourceResolver>,
}

impl TemplateContentTranslator {
    pub fn new(engine: Arc<TemplateEngine>, resources: Arc<FirstSupportingResourceResolver>) -> Self {
        Self { engine, resources }
    }
}

impl ContentTranslator for TemplateContentTranslator {
    fn name(&self) -> &str {
        "template"
    }

    fn supports(&self, content: &Content) -> bool {
        content.is_template()
    }

    fn translate(&self, content: Content) -> Result<Content, FoundationError> {
        let Content::Template(template) = content else {
            return Ok(content);
        };

        let path = ResourcePath::parse(template.path);
        let resource = self.resources.resolve(&path)?;
        let request = TemplateRequest::new(path, resource.as_text()?).with_variables(template.variables);
        let rendered = self.engine.parse(&request)?;
        debug!(template = %request.path, "template rendered");
        Ok(Content::Text(rendered))
    }
}

impl fmt::Debug for TemplateContentTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateContentTranslator")
            .field("engine", &self.engine)
            .finish()
    }
}

/// Applies every translator that supports the content, in registration order.
///
/// Guards are evaluated once against the incoming content. Each part of a
/// [`Content::Multi`] is translated on its own.
pub struct EveryContentTranslator {
    registry: Registry<Content, Arc<dyn ContentTranslator>>,
    probe: CapabilityProbe,
}

impl Default for EveryContentTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl EveryContentTranslator {
    pub fn new() -> Self {
        Self {
            registry: Registry::new("content-translators"),
            probe: CapabilityProbe::empty(),
        }
    }

    pub fn with_translator(mut self, translator: impl ContentTranslator + 'static) -> Self {
        self.add(Arc::new(translator));
        self
    }

    pub fn add(&mut self, translator: Arc<dyn ContentTranslator>) {
        let key = translator.name().to_string();
        let tester = translator.clone();
        let guard = from_fn(format!("supports({key})"), move |content: &Content| tester.supports(content));
        self.registry.register(Candidate::guarded(key, guard, translator));
    }

    pub fn translator_names(&self) -> Vec<&str> {
        self.registry.keys()
    }
}

impl ContentTranslator for EveryContentTranslator {
    fn name(&self) -> &str {
        self.registry.name()
    }

    fn supports(&self, content: &Content) -> bool {
        match content {
            Content::Multi(parts) => parts.iter().any(|part| self.supports(part)),
            single => self.registry.find_first_match(single, &self.probe).is_some(),
        }
    }

    fn translate(&self, content: Content) -> Result<Content, FoundationError> {
        if let Content::Multi(parts) = content {
            return parts
                .into_iter()
                .map(|part| self.translate(part))
                .collect::<Result<Vec<_>, _>>()
                .map(Content::Multi);
        }

        let matches = self
            .registry
            .select_all_matches(&content, &self.probe, MatchRequirement::Optional)
            .map_err(KernelError::from)?;

        let mut content = content;
        for candidate in matches {
            trace!(translator = candidate.key(), "translating content");
            content = candidate.implementation().translate(content)?;
        }
        Ok(content)
    }
}

impl fmt::Debug for EveryContentTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EveryContentTranslator")
            .field("translators", &self.translator_names())
            .finish()
    }
}
