use courier_foundation::{Message, MessageSender, SendError};
use courier_kernel::{Condition, Requirements};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A sender that accepts every message and remembers it.
///
/// Clones share the call history, so a test can hand one clone to a builder
/// and inspect the other.
#[derive(Clone)]
pub struct RecordingSender {
    name: String,
    requirements: Requirements,
    enabled: Option<Condition<Message>>,
    /// Every message delivered so far
    pub call_history: Arc<Mutex<Vec<Message>>>,
}

impl RecordingSender {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            requirements: Requirements::new(),
            enabled: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Capabilities the sender declares.
    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    /// Per-dispatch enablement hook.
    pub fn with_enabled(mut self, enabled: Condition<Message>) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn history(&self) -> Vec<Message> {
        self.call_history.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_history.lock().len()
    }

    /// The call history as JSON, handy in assertion messages.
    pub fn history_json(&self) -> Value {
        serde_json::to_value(&*self.call_history.lock()).unwrap_or(Value::Null)
    }
}

impl MessageSender for RecordingSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, message: &Message) -> Result<(), SendError> {
        self.call_history.lock().push(message.clone());
        Ok(())
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }

    fn currently_enabled(&self) -> Option<Condition<Message>> {
        self.enabled.clone()
    }
}

/// A sender whose every attempt breaks.
#[derive(Clone)]
pub struct FailingSender {
    name: String,
    reason: String,
    attempts: Arc<AtomicUsize>,
}

impl FailingSender {
    pub fn new(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.to_string(),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl MessageSender for FailingSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, _message: &Message) -> Result<(), SendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SendError::failed(&self.name, &self.reason))
    }
}

/// A sender that refuses every message without trying.
#[derive(Clone)]
pub struct DecliningSender {
    name: String,
    reason: String,
    attempts: Arc<AtomicUsize>,
}

impl DecliningSender {
    pub fn new(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            reason: reason.to_string(),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl MessageSender for DecliningSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, _message: &Message) -> Result<(), SendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SendError::declined(&self.name, &self.reason))
    }
}

#[macro_export]
macro_rules! assert_sent {
    ($sender:expr, $expected_count:expr) => {
        let count = $sender.call_count();
        assert_eq!(
            count,
            $expected_count,
            "Expected sender '{}' to deliver {} messages, but it delivered {}: {}",
            $crate::senders::sender_name(&$sender),
            $expected_count,
            count,
            $sender.history_json()
        );
    };
}

#[doc(hidden)]
pub fn sender_name(sender: &RecordingSender) -> &str {
    sender.name()
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_foundation::Sms;

    #[test]
    fn recording_sender_keeps_history_across_clones() {
        let sender = RecordingSender::new("smpp");
        let handle = sender.clone();
        sender.send(&Sms::new("hi").to("+33600000000").into()).unwrap();

        assert_sent!(handle, 1);
        assert_eq!(handle.history_json()[0]["kind"], "sms");
    }

    #[test]
    fn failing_and_declining_senders_count_attempts() {
        let failing = FailingSender::new("smtp", "connection refused");
        let declining = DecliningSender::new("sendgrid", "quota reached");
        let message: Message = Sms::new("hi").into();

        assert!(matches!(failing.send(&message), Err(SendError::Failed { .. })));
        assert!(matches!(declining.send(&message), Err(SendError::Declined { .. })));
        assert_eq!(failing.attempts(), 1);
        assert_eq!(declining.attempts(), 1);
    }
}
