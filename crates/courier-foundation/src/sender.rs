//! Sender selection and sender fallback.
//!
//! Each message kind owns a [`MultiImplementationSender`]: the senders able to
//! deliver that kind, each guarded by the capabilities it declares. The
//! first sender, in registration order, whose guard accepts the message
//! delivers it.
//!
//! A [`FallbackSender`] instead tries its senders one after the other until
//! one of them succeeds.

use courier_kernel::conditions::{always_true, and, from_fn};
use courier_kernel::error::{IntoKernelReport, KernelResult};
use courier_kernel::{
    AllCandidatesFailedError, AttemptError, Candidate, CapabilityProbe, Condition, FallbackExecutor, NoMatchError,
    Registry, Requirements,
};
use error_stack::ResultExt;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::message::{Message, MessageKind};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SendError {
    /// The sender chose not to handle the message.
    #[error("sender '{sender}' declined: {reason}")]
    Declined { sender: String, reason: String },

    /// The sender tried to deliver and broke.
    #[error("sender '{sender}' failed: {reason}")]
    Failed { sender: String, reason: String },

    #[error("no sender available: {0}")]
    NoSender(#[from] NoMatchError),

    #[error(transparent)]
    AllFailed(#[from] AllCandidatesFailedError),
}

impl SendError {
    pub fn declined(sender: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Declined {
            sender: sender.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(sender: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            sender: sender.into(),
            reason: reason.into(),
        }
    }
}

/// A concrete delivery implementation.
pub trait MessageSender: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, message: &Message) -> Result<(), SendError>;

    /// Capabilities this sender needs before it may be selected.
    fn requirements(&self) -> Requirements {
        Requirements::default()
    }

    /// Condition re-evaluated on every dispatch.
    fn currently_enabled(&self) -> Option<Condition<Message>> {
        None
    }
}

// ─── Selection ──────────────────────────────────────────────────────────────

/// Collects the senders of one message kind.
pub struct SenderRegistryBuilder {
    kind: MessageKind,
    senders: Vec<Arc<dyn MessageSender>>,
}

impl SenderRegistryBuilder {
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            senders: Vec::new(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn register(mut self, sender: impl MessageSender + 'static) -> Self {
        self.add(Arc::new(sender));
        self
    }

    /// Append a sender. A second sender with the same name is ignored.
    pub fn add(&mut self, sender: Arc<dyn MessageSender>) {
        if self.senders.iter().any(|s| s.name() == sender.name()) {
            debug!(kind = %self.kind, sender = sender.name(), "sender already registered");
            return;
        }
        self.senders.push(sender);
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Compile every sender's requirements into its guard.
    pub fn build(self, probe: Arc<CapabilityProbe>) -> KernelResult<MultiImplementationSender> {
        let kind = self.kind;
        let mut registry = Registry::new(format!("{kind}-senders"));

        for sender in self.senders {
            let requirements = sender
                .requirements()
                .compile::<Message>()
                .into_report()
                .attach(format!("compiling requirements of {kind} sender '{}'", sender.name()))?;

            let of_kind = from_fn(format!("kind({kind})"), move |m: &Message| m.kind() == kind);
            let guard = if requirements.is_always_true() {
                of_kind
            } else {
                and([of_kind, requirements])
            };

            let key = sender.name().to_string();
            registry.register(
                Candidate::guarded(key, guard, sender)
                    .with_runtime_guard(|s: &Arc<dyn MessageSender>| s.currently_enabled().unwrap_or_else(always_true)),
            );
        }

        Ok(MultiImplementationSender {
            kind,
            registry,
            probe,
        })
    }
}

/// Delivers a message through the first sender whose guard accepts it.
pub struct MultiImplementationSender {
    kind: MessageKind,
    registry: Registry<Message, Arc<dyn MessageSender>>,
    probe: Arc<CapabilityProbe>,
}

impl MultiImplementationSender {
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Sender names in selection order.
    pub fn sender_names(&self) -> Vec<&str> {
        self.registry.keys()
    }

    /// Whether some sender can currently deliver the message.
    pub fn supports(&self, message: &Message) -> bool {
        self.registry.find_first_match(message, &self.probe).is_some()
    }

    pub fn select(&self, message: &Message) -> Result<&dyn MessageSender, NoMatchError> {
        let candidate = self.registry.select_first_match(message, &self.probe)?;
        Ok(candidate.implementation().as_ref())
    }

    pub fn send(&self, message: &Message) -> Result<(), SendError> {
        let sender = self.select(message)?;
        info!(kind = %self.kind, sender = sender.name(), "sending message");
        sender.send(message)
    }
}

impl fmt::Debug for MultiImplementationSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiImplementationSender")
            .field("kind", &self.kind)
            .field("registry", &self.registry)
            .finish()
    }
}

// ─── Fallback ───────────────────────────────────────────────────────────────

/// Tries each sender in order until one delivers the message.
pub struct FallbackSender {
    executor: FallbackExecutor<Arc<dyn MessageSender>>,
}

impl FallbackSender {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            executor: FallbackExecutor::new(name),
        }
    }

    pub fn with_sender(mut self, sender: impl MessageSender + 'static) -> Self {
        let sender: Arc<dyn MessageSender> = Arc::new(sender);
        self.executor.push(sender.name().to_string(), sender);
        self
    }

    pub fn sender_names(&self) -> Vec<&str> {
        self.executor.keys()
    }
}

impl MessageSender for FallbackSender {
    fn name(&self) -> &str {
        self.executor.name()
    }

    fn send(&self, message: &Message) -> Result<(), SendError> {
        let delivered = self.executor.execute_with_fallback(|sender| {
            sender.send(message).map_err(|error| match error {
                SendError::Declined { reason, .. } => AttemptError::declined(reason),
                other => AttemptError::failed(other),
            })
        })?;
        info!(fallback = self.name(), sender = %delivered.candidate, "message delivered");
        Ok(())
    }
}

impl fmt::Debug for FallbackSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackSender")
            .field("executor", &self.executor)
            .finish()
    }
}
