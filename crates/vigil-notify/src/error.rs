//! # Notification Error Types

use thiserror::Error;

/// Errors from outbound notification attempts.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// No mail relay endpoint is configured for this deployment.
    #[error("mail relay not configured")]
    RelayNotConfigured,

    /// The relay could not be reached (connect, DNS, TLS, timeout).
    #[error("mail relay unreachable: {0}")]
    Transport(String),

    /// The relay answered with a non-success status.
    #[error("mail relay rejected the message: HTTP {0}")]
    RelayStatus(u16),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        // Strip the URL: relay addresses can carry tokens in query strings.
        Self::Transport(err.without_url().to_string())
    }
}
