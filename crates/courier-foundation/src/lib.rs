//! Messaging strategy families built on `courier-kernel`.
//!
//! Each family is an ordinary plug-in over the kernel's selection modes:
//!
//! - senders per message kind (first match) and sender fallback,
//! - template engines picked per template by detection,
//! - resource resolvers picked by lookup prefix,
//! - content variants picked by existence,
//! - MIME type providers tried in sequence,
//! - content translators applied all at once.
//!
//! [`MessagingBuilder`] wires them into a [`MessagingService`].

// messages
pub mod message;
pub use message::{Content, Email, Message, MessageKind, Sms, TemplateContent};

// senders
pub mod sender;
pub use sender::{FallbackSender, MessageSender, MultiImplementationSender, SendError, SenderRegistryBuilder};

// resources
pub mod resource;
pub use resource::{
    EmbeddedResolver, FileResolver, FirstSupportingResourceResolver, Lookup, RelativeResolver, Resource,
    ResourceError, ResourcePath, ResourceResolutionBuilder, ResourceResolver, StringResolver,
};

// template engines
pub mod template;
pub use template::{
    PlaceholderParser, Placeholders, TemplateEngine, TemplateEnginesBuilder, TemplateError, TemplateParser,
    TemplateRequest, content_marker_detector, extension_detector, fixed_detector,
};

// content variants
pub mod variant;
pub use variant::{
    ExtensionVariantResolver, FirstExistingVariantResolver, Variant, VariantError, VariantRequest, VariantResolver,
};

// mime types
pub mod mimetype;
pub use mimetype::{
    ExtensionProvider, FallbackMimeTypeProvider, FixedProvider, MagicBytesProvider, MimeType, MimeTypeError,
    MimeTypeProvider,
};

// content translation
pub mod translator;
pub use translator::{ContentTranslator, EveryContentTranslator, TemplateContentTranslator};

// messaging facade
pub mod messaging;
pub use messaging::{MessagingBuilder, MessagingService};

// error module
pub mod error;
pub use error::{FoundationError, FoundationResult, IntoFoundationReport};
