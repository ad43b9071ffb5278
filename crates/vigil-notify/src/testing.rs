//! # Notifier Test Doubles
//!
//! Shipped in the crate proper (not behind `cfg(test)`) so downstream
//! crates' tests can compose them: the release engine's partial-failure
//! tests live in `vigil-release`, and the API integration suite wires a
//! `RecordingNotifier` into the whole app.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::NotifyError;
use crate::message::ReleaseMessage;
use crate::Notifier;

/// Records every send and succeeds, except for addresses explicitly
/// marked as failing.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<ReleaseMessage>>,
    verifications: Mutex<Vec<(String, String)>>,
    fail_addresses: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    /// Create a double that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to `email` fail from now on.
    pub fn fail_for(&self, email: &str) {
        self.fail_addresses.lock().insert(email.to_string());
    }

    /// Release messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<ReleaseMessage> {
        self.sent.lock().clone()
    }

    /// Verification links accepted so far, as `(to, url)` pairs.
    pub fn verifications(&self) -> Vec<(String, String)> {
        self.verifications.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_release(&self, message: &ReleaseMessage) -> Result<(), NotifyError> {
        if self.fail_addresses.lock().contains(&message.recipient_email) {
            return Err(NotifyError::Transport("simulated delivery failure".into()));
        }
        self.sent.lock().push(message.clone());
        Ok(())
    }

    async fn send_verification(&self, to: &str, verify_url: &str) -> Result<(), NotifyError> {
        if self.fail_addresses.lock().contains(to) {
            return Err(NotifyError::Transport("simulated delivery failure".into()));
        }
        self.verifications
            .lock()
            .push((to.to_string(), verify_url.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "RecordingNotifier"
    }
}

/// Fails every send with a transport error.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_release(&self, _message: &ReleaseMessage) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("connection refused".into()))
    }

    async fn send_verification(&self, _to: &str, _verify_url: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("connection refused".into()))
    }

    fn name(&self) -> &'static str {
        "FailingNotifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::RecipientId;

    fn message(email: &str) -> ReleaseMessage {
        ReleaseMessage {
            recipient_id: RecipientId::new(),
            recipient_name: "Ada".into(),
            recipient_email: email.into(),
            owner_email: "owner@example.org".into(),
            items: vec![],
            obligations: vec![],
            is_demo: false,
        }
    }

    #[tokio::test]
    async fn recording_notifier_records_in_order() {
        let notifier = RecordingNotifier::new();
        notifier.send_release(&message("a@example.org")).await.unwrap();
        notifier.send_release(&message("b@example.org")).await.unwrap();
        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].recipient_email, "a@example.org");
    }

    #[tokio::test]
    async fn marked_addresses_fail() {
        let notifier = RecordingNotifier::new();
        notifier.fail_for("b@example.org");
        assert!(notifier.send_release(&message("a@example.org")).await.is_ok());
        assert!(notifier.send_release(&message("b@example.org")).await.is_err());
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn failing_notifier_always_fails() {
        let notifier = FailingNotifier;
        assert!(notifier.send_release(&message("a@example.org")).await.is_err());
    }
}
