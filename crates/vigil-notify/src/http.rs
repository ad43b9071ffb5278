//! # HTTP Mail Relay Notifier
//!
//! Posts JSON to a mail relay service (the deployment's transactional
//! email gateway). The relay owns template rendering and actual SMTP;
//! Vigil only hands over structured content.
//!
//! One POST per message, 10 second timeout, no retry. Logs record the
//! recipient address and status, never item content.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::error::NotifyError;
use crate::message::ReleaseMessage;
use crate::Notifier;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound payload for the relay's `/send` endpoint.
#[derive(Serialize)]
struct RelayPayload<'a> {
    kind: &'static str,
    to: &'a str,
    to_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<serde_json::Value>,
}

/// Production notifier posting to an HTTP mail relay.
pub struct HttpEmailNotifier {
    client: reqwest::Client,
    endpoint: Url,
    bearer_token: Option<String>,
}

impl HttpEmailNotifier {
    /// Build a notifier for `endpoint`, optionally authenticating with a
    /// bearer token.
    pub fn new(endpoint: Url, bearer_token: Option<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(NotifyError::from)?;
        Ok(Self {
            client,
            endpoint,
            bearer_token,
        })
    }

    async fn post(&self, payload: &RelayPayload<'_>) -> Result<(), NotifyError> {
        let mut request = self.client.post(self.endpoint.clone()).json(payload);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(to = payload.to, status = status.as_u16(), "mail relay rejected send");
            return Err(NotifyError::RelayStatus(status.as_u16()));
        }
        tracing::info!(to = payload.to, kind = payload.kind, "mail relay accepted send");
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpEmailNotifier {
    async fn send_release(&self, message: &ReleaseMessage) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "owner_email": message.owner_email,
            "is_demo": message.is_demo,
            "messages": message.items,
            "obligations": message.obligations,
        });
        self.post(&RelayPayload {
            kind: "legacy_release",
            to: &message.recipient_email,
            to_name: Some(&message.recipient_name),
            body: Some(body),
        })
        .await
    }

    async fn send_verification(&self, to: &str, verify_url: &str) -> Result<(), NotifyError> {
        self.post(&RelayPayload {
            kind: "trusted_contact_verification",
            to,
            to_name: None,
            body: Some(serde_json::json!({ "verify_url": verify_url })),
        })
        .await
    }

    fn name(&self) -> &'static str {
        "HttpEmailNotifier"
    }
}

impl std::fmt::Debug for HttpEmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmailNotifier")
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.bearer_token.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructed_notifier_coerces_to_trait_object() {
        let notifier: std::sync::Arc<dyn Notifier> = std::sync::Arc::new(
            HttpEmailNotifier::new(Url::parse("https://relay.example/send").unwrap(), None)
                .unwrap(),
        );
        assert_eq!(notifier.name(), "HttpEmailNotifier");
    }

    #[test]
    fn debug_does_not_leak_token() {
        let notifier = HttpEmailNotifier::new(
            Url::parse("https://relay.example/send").unwrap(),
            Some("sekrit-token".into()),
        )
        .unwrap();
        let debug = format!("{notifier:?}");
        assert!(!debug.contains("sekrit"));
        assert!(debug.contains("relay.example"));
    }
}
