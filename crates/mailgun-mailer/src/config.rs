//! Mailgun settings and the gate that decides whether the hook may run
//!
//! The host loads [`MailgunConfig`] once and hands it to the hook. Every send
//! attempt passes it through [`ConfigGate::check`]; when the API key or the
//! sending domain is blank the hook steps aside and the host's default
//! mailer delivers the message instead.

use std::fmt;

use serde::Deserialize;
use tracing::debug;

/// Default Mailgun API endpoint (US region)
pub const DEFAULT_ENDPOINT: &str = "https://api.mailgun.net";

/// Mailgun settings as supplied by the host
#[derive(Clone, Default, Deserialize)]
pub struct MailgunConfig {
    /// Private API key (`key-...`)
    #[serde(default)]
    pub api_key: String,

    /// Verified sending domain
    #[serde(default)]
    pub domain: String,

    /// API endpoint override, e.g. `https://api.eu.mailgun.net`
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl MailgunConfig {
    pub fn new(api_key: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            domain: domain.into(),
            endpoint: None,
        }
    }

    /// Use a regional endpoint instead of [`DEFAULT_ENDPOINT`]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Load from environment variables
    ///
    /// Unset variables are treated as empty, which the gate reports as
    /// missing configuration.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from any variable source keyed like the environment
    /// (`MAILGUN_API_KEY`, `MAILGUN_DOMAIN`, `MAILGUN_ENDPOINT`)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: lookup("MAILGUN_API_KEY").unwrap_or_default(),
            domain: lookup("MAILGUN_DOMAIN").unwrap_or_default(),
            endpoint: lookup("MAILGUN_ENDPOINT").filter(|v| !v.trim().is_empty()),
        }
    }
}

impl fmt::Debug for MailgunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailgunConfig")
            .field("api_key", &redact(&self.api_key))
            .field("domain", &self.domain)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Settings that passed the gate
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub domain: String,
    pub endpoint: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("domain", &self.domain)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Which required setting is blank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSetting {
    ApiKey,
    Domain,
}

impl MissingSetting {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingSetting::ApiKey => "api_key",
            MissingSetting::Domain => "domain",
        }
    }
}

impl fmt::Display for MissingSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "Mailgun {0} is not set. Please update your configuration with the correct Mailgun API settings"
    )]
    Missing(MissingSetting),
}

/// Outcome of checking the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Both required settings are present
    Ready(Credentials),
    /// The hook must not run; the host mailer handles delivery
    NotConfigured(ConfigError),
}

impl Gate {
    pub fn is_ready(&self) -> bool {
        matches!(self, Gate::Ready(_))
    }
}

/// Decides whether the Mailgun path is usable
pub struct ConfigGate;

impl ConfigGate {
    /// Check the API key and domain are non-blank
    ///
    /// Has no side effects beyond a debug log, so it is safe to call on
    /// every send attempt.
    pub fn check(config: &MailgunConfig) -> Gate {
        let missing = if config.api_key.trim().is_empty() {
            Some(MissingSetting::ApiKey)
        } else if config.domain.trim().is_empty() {
            Some(MissingSetting::Domain)
        } else {
            None
        };

        if let Some(setting) = missing {
            let err = ConfigError::Missing(setting);
            debug!(setting = %setting, "Mailgun not configured");
            return Gate::NotConfigured(err);
        }

        Gate::Ready(Credentials {
            api_key: config.api_key.trim().to_string(),
            domain: config.domain.trim().to_string(),
            endpoint: config
                .endpoint
                .as_deref()
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        })
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}
