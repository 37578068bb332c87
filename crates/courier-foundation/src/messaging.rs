//! The messaging facade.
//!
//! [`MessagingBuilder`] composes the strategy families (senders per message
//! kind, template engines, resource resolvers and content translators) into
//! a [`MessagingService`]. Every capability check made while selecting goes
//! through one shared [`CapabilityProbe`] built from the configured
//! [`Environment`].
//!
//! ```rust,ignore
//! let service = MessagingBuilder::new()
//!     .with_environment(Environment::default().with_component("smtp"))
//!     .with_email_sender(SmtpSender::default())
//!     .build()?;
//! service.send(Email::new("Hello", "Welcome aboard").to("ada@example.org").into())?;
//! ```

use crate::error::{FoundationError, FoundationResult, IntoFoundationReport};
use crate::message::{Content, Message, MessageKind};
use crate::resource::{FirstSupportingResourceResolver, ResourcePath, ResourceResolutionBuilder};
use crate::sender::{MessageSender, MultiImplementationSender, SenderRegistryBuilder};
use crate::template::TemplateEnginesBuilder;
use crate::translator::{ContentTranslator, EveryContentTranslator, TemplateContentTranslator};
use crate::variant::{FirstExistingVariantResolver, Variant, VariantRequest};
use courier_kernel::{CapabilityProbe, Environment};
use error_stack::{Report, ResultExt};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub struct MessagingBuilder {
    environment: Environment,
    email: SenderRegistryBuilder,
    sms: SenderRegistryBuilder,
    templates: TemplateEnginesBuilder,
    resources: ResourceResolutionBuilder,
    translators: Vec<Arc<dyn ContentTranslator>>,
}

impl Default for MessagingBuilder {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            email: SenderRegistryBuilder::new(MessageKind::Email),
            sms: SenderRegistryBuilder::new(MessageKind::Sms),
            templates: TemplateEnginesBuilder::new(),
            resources: ResourceResolutionBuilder::new(),
            translators: Vec::new(),
        }
    }
}

impl MessagingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Components and properties capability checks run against.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_email_sender(mut self, sender: impl MessageSender + 'static) -> Self {
        self.email = self.email.register(sender);
        self
    }

    pub fn with_sms_sender(mut self, sender: impl MessageSender + 'static) -> Self {
        self.sms = self.sms.register(sender);
        self
    }

    pub fn with_template_engines(mut self, templates: TemplateEnginesBuilder) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_resources(mut self, resources: ResourceResolutionBuilder) -> Self {
        self.resources = resources;
        self
    }

    /// Extra translator, applied after template rendering.
    pub fn with_translator(mut self, translator: impl ContentTranslator + 'static) -> Self {
        self.translators.push(Arc::new(translator));
        self
    }

    pub fn build(self) -> FoundationResult<MessagingService> {
        if self.email.is_empty() && self.sms.is_empty() {
            return Err(Report::new(FoundationError::Configuration(
                "no email or sms sender registered".into(),
            )));
        }

        let probe = Arc::new(self.environment.into_probe());
        let resources = Arc::new(self.resources.build());

        let mut translator = EveryContentTranslator::new();
        let mut variants = FirstExistingVariantResolver::new(resources.clone());
        if !self.templates.is_empty() {
            let engine = self
                .templates
                .build(probe.clone())
                .into_report()
                .attach("building template engines")?;
            for resolver in engine.variant_resolvers() {
                variants.add(Arc::new(resolver));
            }
            translator.add(Arc::new(TemplateContentTranslator::new(Arc::new(engine), resources.clone())));
        }
        for extra in self.translators {
            translator.add(extra);
        }

        let email = self
            .email
            .build(probe.clone())
            .change_context(FoundationError::Configuration("email senders".into()))?;
        let sms = self
            .sms
            .build(probe.clone())
            .change_context(FoundationError::Configuration("sms senders".into()))?;

        info!(
            email = ?email.sender_names(),
            sms = ?sms.sender_names(),
            translators = ?translator.translator_names(),
            "messaging service built"
        );

        Ok(MessagingService {
            probe,
            email,
            sms,
            translator,
            resources,
            variants,
        })
    }
}

impl fmt::Debug for MessagingBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagingBuilder")
            .field("email_senders", &!self.email.is_empty())
            .field("sms_senders", &!self.sms.is_empty())
            .field("template_engines", &!self.templates.is_empty())
            .field("translators", &self.translators.len())
            .finish()
    }
}

/// Translates message content and hands the message to a sender of its kind.
pub struct MessagingService {
    probe: Arc<CapabilityProbe>,
    email: MultiImplementationSender,
    sms: MultiImplementationSender,
    translator: EveryContentTranslator,
    resources: Arc<FirstSupportingResourceResolver>,
    variants: FirstExistingVariantResolver,
}

impl MessagingService {
    pub fn probe(&self) -> &CapabilityProbe {
        &self.probe
    }

    pub fn resources(&self) -> &FirstSupportingResourceResolver {
        &self.resources
    }

    pub fn senders(&self, kind: MessageKind) -> &MultiImplementationSender {
        match kind {
            MessageKind::Email => &self.email,
            MessageKind::Sms => &self.sms,
        }
    }

    /// Whether some sender can currently deliver the message.
    pub fn supports(&self, message: &Message) -> bool {
        self.senders(message.kind()).supports(message)
    }

    /// Path of the first existing `variant` of a template.
    pub fn resolve_variant(&self, template: impl Into<ResourcePath>, variant: Variant) -> FoundationResult<ResourcePath> {
        let request = VariantRequest::new(template, variant);
        self.variants.resolve(&request).into_report()
    }

    pub fn send(&self, mut message: Message) -> FoundationResult<()> {
        let kind = message.kind();
        let content = message.replace_content(Content::Text(String::new()));
        let translated = self
            .translator
            .translate(content)
            .into_report()
            .attach(format!("translating {kind} content"))?;
        message.replace_content(translated);
        debug!(%kind, recipients = ?message.recipients(), "content translated");

        self.senders(kind)
            .send(&message)
            .into_report()
            .attach(format!("sending {kind} message"))
    }
}

impl fmt::Debug for MessagingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagingService")
            .field("email", &self.email)
            .field("sms", &self.sms)
            .field("translator", &self.translator)
            .field("resources", &self.resources)
            .finish()
    }
}
