//! Template engine auto-detection.
//!
//! Several template engines may be configured at once. For each template the
//! engines' detectors are asked, in registration order, whether they can
//! handle it; the first positive one parses it. Engines whose requirements
//! are not met take no part. With a single eligible engine, detection is
//! skipped and that engine always parses.

use crate::resource::{ResourceError, ResourcePath};
use crate::variant::{ExtensionVariantResolver, Variant};
use courier_kernel::conditions::{always_true, from_fn};
use courier_kernel::{
    AdapterTable, CapabilityProbe, Condition, Detected, DetectingDispatcher, MisconfiguredAdapterError, NoMatchError,
    Requirements,
};
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::debug;

static BRACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("valid regex"));
static DOLLAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\s*([A-Za-z0-9_.-]+)\s*\}").expect("valid regex"));

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TemplateError {
    #[error("no template parser configured")]
    NoParserAvailable,

    #[error("no template engine detected: {0}")]
    NotDetected(#[from] NoMatchError),

    #[error("template '{template}' uses undefined variable '{variable}'")]
    MissingVariable { template: String, variable: String },

    #[error(transparent)]
    Adapter(#[from] MisconfiguredAdapterError),

    #[error("engine '{engine}' has no extension for the {variant} variant")]
    UnsupportedVariant { engine: String, variant: Variant },

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("invalid requirements for template engine '{engine}': {source}")]
    Requirements { engine: String, source: regex::Error },
}

/// A loaded template ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRequest {
    pub path: ResourcePath,
    pub source: String,
    pub variables: BTreeMap<String, String>,
}

impl TemplateRequest {
    pub fn new(path: impl Into<ResourcePath>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

pub trait TemplateParser: Send + Sync {
    fn name(&self) -> &str;

    fn parse(&self, request: &TemplateRequest) -> Result<String, TemplateError>;

    /// Capabilities the engine needs before it takes part in detection.
    fn requirements(&self) -> Requirements {
        Requirements::default()
    }
}

// ─── Detectors ──────────────────────────────────────────────────────────────

/// Detects templates whose path ends with one of `extensions`.
pub fn extension_detector<I, E>(extensions: I) -> Condition<TemplateRequest>
where
    I: IntoIterator<Item = E>,
    E: Into<String>,
{
    let extensions: Vec<String> = extensions.into_iter().map(Into::into).collect();
    let label = extensions.join("|");
    from_fn(format!("extension({label})"), move |request: &TemplateRequest| {
        extensions.iter().any(|ext| request.path.path().ends_with(ext.as_str()))
    })
}

/// Detects templates whose source contains `marker`.
pub fn content_marker_detector(marker: impl Into<String>) -> Condition<TemplateRequest> {
    let marker = marker.into();
    from_fn(format!("contains({marker})"), move |request: &TemplateRequest| {
        request.source.contains(marker.as_str())
    })
}

pub fn fixed_detector(detected: bool) -> Condition<TemplateRequest> {
    Condition::Fixed(detected)
}

// ─── Placeholder parser ─────────────────────────────────────────────────────

/// Placeholder syntax understood by [`PlaceholderParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholders {
    /// `{{name}}`
    Braces,
    /// `${name}`
    Dollar,
}

impl Placeholders {
    fn pattern(self) -> &'static Regex {
        match self {
            Placeholders::Braces => &BRACES,
            Placeholders::Dollar => &DOLLAR,
        }
    }

    /// Marker that identifies this syntax in a template source.
    pub fn marker(self) -> &'static str {
        match self {
            Placeholders::Braces => "{{",
            Placeholders::Dollar => "${",
        }
    }
}

/// Substitutes named placeholders with request variables.
#[derive(Debug, Clone)]
pub struct PlaceholderParser {
    name: String,
    syntax: Placeholders,
    requirements: Requirements,
}

impl PlaceholderParser {
    pub fn new(name: impl Into<String>, syntax: Placeholders) -> Self {
        Self {
            name: name.into(),
            syntax,
            requirements: Requirements::default(),
        }
    }

    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn syntax(&self) -> Placeholders {
        self.syntax
    }
}

impl TemplateParser for PlaceholderParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, request: &TemplateRequest) -> Result<String, TemplateError> {
        let pattern = self.syntax.pattern();
        if let Some(missing) = pattern
            .captures_iter(&request.source)
            .map(|caps| caps[1].to_string())
            .find(|name| !request.variables.contains_key(name))
        {
            return Err(TemplateError::MissingVariable {
                template: request.path.to_string(),
                variable: missing,
            });
        }
        let rendered = pattern.replace_all(&request.source, |caps: &Captures<'_>| {
            request.variables.get(&caps[1]).cloned().unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }
}

// ─── Engine ─────────────────────────────────────────────────────────────────

struct EngineEntry {
    parser: Arc<dyn TemplateParser>,
    detector: Option<Condition<TemplateRequest>>,
}

/// Collects the configured template engines.
#[derive(Default)]
pub struct TemplateEnginesBuilder {
    engines: Vec<EngineEntry>,
    variants: Vec<(String, Variant, String)>,
}

impl TemplateEnginesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that accepts every template when detection runs.
    pub fn register(self, parser: impl TemplateParser + 'static) -> Self {
        self.push(Arc::new(parser), None)
    }

    pub fn register_detected(self, parser: impl TemplateParser + 'static, detector: Condition<TemplateRequest>) -> Self {
        self.push(Arc::new(parser), Some(detector))
    }

    fn push(mut self, parser: Arc<dyn TemplateParser>, detector: Option<Condition<TemplateRequest>>) -> Self {
        self.engines.push(EngineEntry { parser, detector });
        self
    }

    /// File extension of `variant` templates for `engine`.
    pub fn with_variant_extension(
        mut self,
        engine: impl Into<String>,
        variant: Variant,
        extension: impl Into<String>,
    ) -> Self {
        self.variants.push((engine.into(), variant, extension.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn build(self, probe: Arc<CapabilityProbe>) -> Result<TemplateEngine, TemplateError> {
        if self.engines.is_empty() {
            return Err(TemplateError::NoParserAvailable);
        }

        let mut dispatcher = DetectingDispatcher::new("template-engines");
        for entry in self.engines {
            let key = entry.parser.name().to_string();
            let guard = entry
                .parser
                .requirements()
                .compile::<()>()
                .map_err(|source| TemplateError::Requirements {
                    engine: key.clone(),
                    source,
                })?;
            let detector = entry.detector.unwrap_or_else(always_true);
            dispatcher.register_guarded(key, guard, detector, entry.parser);
        }
        debug!(
            engines = ?dispatcher.keys(),
            eligible = ?dispatcher.eligible_keys(&probe),
            "template engines built"
        );

        let mut extensions: BTreeMap<String, HashMap<Variant, String>> = BTreeMap::new();
        for (engine, variant, extension) in self.variants {
            extensions.entry(engine).or_default().insert(variant, extension);
        }
        let mut variants = AdapterTable::new("template-variants");
        for (engine, table) in extensions {
            variants.register(engine, table);
        }

        Ok(TemplateEngine {
            dispatcher,
            variants,
            probe,
        })
    }
}

/// Parses templates with the detected engine.
pub struct TemplateEngine {
    dispatcher: DetectingDispatcher<TemplateRequest, Arc<dyn TemplateParser>>,
    variants: AdapterTable<HashMap<Variant, String>>,
    probe: Arc<CapabilityProbe>,
}

impl TemplateEngine {
    /// Engines whose requirements are met, in registration order.
    pub fn engine_names(&self) -> Vec<&str> {
        self.dispatcher.eligible_keys(&self.probe)
    }

    pub fn detect(&self, request: &TemplateRequest) -> Result<Detected<'_, Arc<dyn TemplateParser>>, NoMatchError> {
        self.dispatcher.dispatch_by_detection(request, &self.probe)
    }

    pub fn parse(&self, request: &TemplateRequest) -> Result<String, TemplateError> {
        let detected = self.detect(request)?;
        debug!(template = %request.path, engine = detected.key, bypassed = detected.bypassed, "parsing template");
        detected.implementation.parse(request)
    }

    /// Extension the detected engine uses for `variant` templates.
    pub fn variant_extension(&self, request: &TemplateRequest, variant: &Variant) -> Result<&str, TemplateError> {
        let detected = self.detect(request)?;
        let table = self.variants.adapt(detected.key)?;
        table
            .get(variant)
            .map(String::as_str)
            .ok_or_else(|| TemplateError::UnsupportedVariant {
                engine: detected.key.to_string(),
                variant: variant.clone(),
            })
    }

    /// One variant resolver per engine with variant extensions, in engine order.
    pub fn variant_resolvers(&self) -> Vec<ExtensionVariantResolver> {
        self.engine_names()
            .into_iter()
            .filter_map(|engine| {
                self.variants
                    .adapt(engine)
                    .ok()
                    .map(|table| ExtensionVariantResolver::from_extensions(engine, table.clone()))
            })
            .collect()
    }
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("dispatcher", &self.dispatcher)
            .field("variants", &self.variants)
            .finish()
    }
}
