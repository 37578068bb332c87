//! Messages and their content.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of message, used to route it to the right sender family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Email,
    Sms,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Email => write!(f, "email"),
            MessageKind::Sms => write!(f, "sms"),
        }
    }
}

/// Reference to a template plus the variables to render it with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateContent {
    /// Resource path, optionally prefixed with a lookup such as `classpath:`.
    pub path: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl TemplateContent {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    Text(String),
    Template(TemplateContent),
    /// Alternative bodies, e.g. an HTML and a plain-text part.
    Multi(Vec<Content>),
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(text.into())
    }

    pub fn template(template: TemplateContent) -> Self {
        Content::Template(template)
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Content::Template(_))
    }

    /// Text of a plain body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::text(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub subject: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Vec<String>,
    pub content: Content,
}

impl Email {
    pub fn new(subject: impl Into<String>, content: impl Into<Content>) -> Self {
        Self {
            subject: subject.into(),
            from: None,
            to: Vec::new(),
            content: content.into(),
        }
    }

    pub fn from_address(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sms {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Vec<String>,
    pub content: Content,
}

impl Sms {
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            from: None,
            to: Vec::new(),
            content: content.into(),
        }
    }

    pub fn from_number(mut self, number: impl Into<String>) -> Self {
        self.from = Some(number.into());
        self
    }

    pub fn to(mut self, number: impl Into<String>) -> Self {
        self.to.push(number.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Email(Email),
    Sms(Sms),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Email(_) => MessageKind::Email,
            Message::Sms(_) => MessageKind::Sms,
        }
    }

    pub fn content(&self) -> &Content {
        match self {
            Message::Email(email) => &email.content,
            Message::Sms(sms) => &sms.content,
        }
    }

    /// Replace the content, returning the previous one.
    pub fn replace_content(&mut self, content: Content) -> Content {
        let slot = match self {
            Message::Email(email) => &mut email.content,
            Message::Sms(sms) => &mut sms.content,
        };
        std::mem::replace(slot, content)
    }

    pub fn recipients(&self) -> &[String] {
        match self {
            Message::Email(email) => &email.to,
            Message::Sms(sms) => &sms.to,
        }
    }
}

impl From<Email> for Message {
    fn from(email: Email) -> Self {
        Message::Email(email)
    }
}

impl From<Sms> for Message {
    fn from(sms: Sms) -> Self {
        Message::Sms(sms)
    }
}
