//! Entry point called by the host mail pipeline before default delivery

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info, instrument, warn};

use crate::batch::{send_batch_message, BatchReceipt, MailgunError};
use crate::config::{ConfigError, ConfigGate, Credentials, Gate, MailgunConfig};
use crate::provider::MailgunApi;
use crate::types::{HeaderMap, MailAddress};

/// What the hook did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// API key or domain missing; Mailgun was never contacted
    NotConfigured(ConfigError),
    /// Mailgun accepted the batch
    Sent(BatchReceipt),
    /// The send was attempted and failed
    Failed(MailgunError),
}

impl HookOutcome {
    /// True when Mailgun took the message and the default mailer must not
    pub fn handled(&self) -> bool {
        matches!(self, HookOutcome::Sent(_))
    }

    /// True when the host should deliver the message itself
    pub fn should_fall_back(&self) -> bool {
        !self.handled()
    }
}

/// Outgoing-mail hook backed by Mailgun
///
/// Holds the host's settings and a factory that builds a Mailgun client from
/// the validated [`Credentials`]. The factory only runs once the
/// configuration has passed the gate, so the client always authenticates
/// with the configured key against the configured endpoint.
pub struct MailgunHook<F> {
    config: MailgunConfig,
    make_client: F,
    warned_not_configured: AtomicBool,
}

impl<F, C> MailgunHook<F>
where
    F: Fn(&Credentials) -> C,
    C: MailgunApi,
{
    pub fn new(config: MailgunConfig, make_client: F) -> Self {
        Self {
            config,
            make_client,
            warned_not_configured: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &MailgunConfig {
        &self.config
    }

    /// Try to deliver a message through Mailgun
    ///
    /// Never panics and never returns an error: every path ends in a
    /// [`HookOutcome`] the host can branch on.
    #[instrument(skip_all, fields(to = to.len(), subject = %subject))]
    pub async fn on_alternate_user_mailer(
        &self,
        headers: &HeaderMap,
        to: &[MailAddress],
        from: &MailAddress,
        subject: &str,
        body: &str,
    ) -> HookOutcome {
        let credentials = match ConfigGate::check(&self.config) {
            Gate::Ready(credentials) => credentials,
            Gate::NotConfigured(err) => {
                // Hosts may leave Mailgun off on purpose; say so once
                if !self.warned_not_configured.swap(true, Ordering::Relaxed) {
                    warn!("{}", err);
                }
                return HookOutcome::NotConfigured(err);
            }
        };

        let client = (self.make_client)(&credentials);

        match send_batch_message(
            &client,
            &credentials.domain,
            headers,
            to,
            from,
            subject,
            body,
        )
        .await
        {
            Ok(receipt) => {
                info!(message_id = %receipt.id, "Mail handed to Mailgun");
                HookOutcome::Sent(receipt)
            }
            Err(e) => {
                error!(error = %e, "Mailgun delivery failed, falling back");
                HookOutcome::Failed(e)
            }
        }
    }
}

impl<F> fmt::Debug for MailgunHook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailgunHook")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MissingSetting;
    use crate::provider::ProviderError;
    use crate::recording::RecordingClient;

    fn hook(
        api_key: &str,
        domain: &str,
        client: &RecordingClient,
    ) -> MailgunHook<impl Fn(&Credentials) -> RecordingClient> {
        MailgunHook::new(MailgunConfig::new(api_key, domain), client.connector())
    }

    async fn send(hook: &MailgunHook<impl Fn(&Credentials) -> RecordingClient>) -> HookOutcome {
        let headers: HeaderMap = [("Some header", "Some value")].into_iter().collect();
        hook.on_alternate_user_mailer(
            &headers,
            &[MailAddress::new("receiver@example.com")],
            &MailAddress::new("sender@example.com"),
            "Some subject",
            "Email body",
        )
        .await
    }

    #[tokio::test]
    async fn test_no_api_key() {
        let client = RecordingClient::new();
        let outcome = send(&hook("", "example.com", &client)).await;

        assert_eq!(
            outcome,
            HookOutcome::NotConfigured(ConfigError::Missing(MissingSetting::ApiKey))
        );
        assert!(outcome.should_fall_back());
        assert_eq!(client.messages_calls(), 0);
        assert!(client.connections().is_empty());
    }

    #[tokio::test]
    async fn test_no_domain() {
        let client = RecordingClient::new();
        let outcome = send(&hook("api_key", "", &client)).await;

        assert_eq!(
            outcome,
            HookOutcome::NotConfigured(ConfigError::Missing(MissingSetting::Domain))
        );
        assert_eq!(client.messages_calls(), 0);
    }

    #[tokio::test]
    async fn test_sent_suppresses_default_mailer() {
        let client = RecordingClient::new();
        let outcome = send(&hook("api_key", "example.com", &client)).await;

        assert!(outcome.handled());
        assert!(!outcome.should_fall_back());
        match outcome {
            HookOutcome::Sent(receipt) => assert_eq!(receipt.recipients, 1),
            other => panic!("Expected Sent, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let client = RecordingClient::failing(ProviderError::Network("connection reset".into()));
        let outcome = send(&hook("api_key", "example.com", &client)).await;

        assert_eq!(
            outcome,
            HookOutcome::Failed(MailgunError::Provider(ProviderError::Network(
                "connection reset".into()
            )))
        );
        assert!(outcome.should_fall_back());
    }

    #[tokio::test]
    async fn test_uses_trimmed_domain() {
        let client = RecordingClient::new();
        send(&hook("api_key", " example.com ", &client)).await;

        assert_eq!(
            client.calls().first(),
            Some(&crate::recording::BatchCall::GetBatchMessage("example.com".into()))
        );
    }

    #[tokio::test]
    async fn test_client_built_from_configured_credentials() {
        let client = RecordingClient::new();
        let config = MailgunConfig::new("key-A", "example.com")
            .with_endpoint("https://api.eu.mailgun.net/");
        let hook = MailgunHook::new(config, client.connector());

        assert!(send(&hook).await.handled());

        let connections = client.connections();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].api_key, "key-A");
        assert_eq!(connections[0].domain, "example.com");
        assert_eq!(connections[0].endpoint, "https://api.eu.mailgun.net");
    }

    #[tokio::test]
    async fn test_default_endpoint_reaches_client() {
        let client = RecordingClient::new();
        send(&hook("key-B", "example.com", &client)).await;

        let connections = client.connections();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].api_key, "key-B");
        assert_eq!(connections[0].endpoint, crate::config::DEFAULT_ENDPOINT);
    }

    #[tokio::test]
    async fn test_not_configured_warning_is_latched() {
        let client = RecordingClient::new();
        let hook = hook("", "example.com", &client);
        assert!(!hook.warned_not_configured.load(Ordering::Relaxed));

        send(&hook).await;
        assert!(hook.warned_not_configured.load(Ordering::Relaxed));

        // Later attempts still fall back without contacting Mailgun
        assert!(matches!(send(&hook).await, HookOutcome::NotConfigured(_)));
        assert_eq!(client.messages_calls(), 0);
    }
}
