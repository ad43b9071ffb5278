//! # vigil-notify — Outbound Notifications for Vigil
//!
//! The release engine and the trusted-contact verification flow both end
//! in an email leaving the system. This crate abstracts that egress behind
//! the object-safe [`Notifier`] trait so the engine composes against an
//! interface, not a transport:
//!
//! - [`HttpEmailNotifier`] — production implementation posting JSON to a
//!   configurable mail relay endpoint.
//! - [`NullNotifier`] — stands in when no relay is configured; every send
//!   fails cleanly so release outcomes record the misconfiguration instead
//!   of silently dropping mail.
//! - [`RecordingNotifier`] / [`FailingNotifier`] — test doubles.
//!
//! Every send is a single best-effort attempt. Retry policy belongs to the
//! caller (the release engine deliberately has none: a failed recipient is
//! recorded, not retried).

pub mod error;
pub mod http;
pub mod message;
pub mod testing;

// Re-export primary types.
pub use error::NotifyError;
pub use http::HttpEmailNotifier;
pub use message::{ObligationLine, ReleaseMessage};
pub use testing::{FailingNotifier, RecordingNotifier};

use async_trait::async_trait;

/// Outbound notification transport.
///
/// Object-safe and `Send + Sync`: the release engine holds it as
/// `Arc<dyn Notifier>`.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one release message to one recipient. Single attempt; any
    /// failure is returned, never retried internally.
    async fn send_release(&self, message: &ReleaseMessage) -> Result<(), NotifyError>;

    /// Deliver a trusted-contact verification link.
    async fn send_verification(&self, to: &str, verify_url: &str) -> Result<(), NotifyError>;

    /// Implementation name for logs (e.g. "HttpEmailNotifier").
    fn name(&self) -> &'static str;
}

/// Notifier used when no mail relay is configured. Sends fail cleanly
/// with [`NotifyError::RelayNotConfigured`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send_release(&self, _message: &ReleaseMessage) -> Result<(), NotifyError> {
        Err(NotifyError::RelayNotConfigured)
    }

    async fn send_verification(&self, _to: &str, _verify_url: &str) -> Result<(), NotifyError> {
        Err(NotifyError::RelayNotConfigured)
    }

    fn name(&self) -> &'static str {
        "NullNotifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_notifier_fails_cleanly() {
        let notifier = NullNotifier;
        let err = notifier
            .send_verification("a@example.org", "https://vigil.example/verify/x")
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::RelayNotConfigured));
    }
}
