//! Mailgun mailer hook - hands outgoing mail to the Mailgun batch-send API
//!
//! The host application calls [`MailgunHook::on_alternate_user_mailer`] before
//! its own mail transport runs. The hook:
//!
//! 1. **Checks configuration** - API key and sending domain must both be set,
//!    otherwise the hook steps aside ([`HookOutcome::NotConfigured`])
//! 2. **Builds one batch message** - from, subject, plain-text body,
//!    reply-to taken from `Return-Path`, remaining headers as custom headers,
//!    one `to` recipient per address
//! 3. **Sends it once** - no retries, no queueing
//!
//! The returned [`HookOutcome`] tells the host whether to suppress its
//! default mailer (`Sent`) or deliver the message itself (`NotConfigured`,
//! `Failed`).
//!
//! ## Architecture
//!
//! ```text
//! host mail pipeline → MailgunHook → ConfigGate → Credentials
//!                                                   ↓
//!                       send_batch_message → MailgunApi (built from Credentials) → Mailgun
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let hook = MailgunHook::new(MailgunConfig::from_env(), |creds: &Credentials| {
//!     MyMailgunClient::new(&creds.api_key, &creds.endpoint)
//! });
//! let outcome = hook
//!     .on_alternate_user_mailer(&headers, &to, &from, subject, body)
//!     .await;
//! if outcome.should_fall_back() {
//!     default_mailer.send(...)?;
//! }
//! ```

pub mod batch;
pub mod config;
pub mod hook;
pub mod provider;
pub mod recording;
pub mod types;

pub use batch::{send_batch_message, BatchReceipt, MailgunError};
pub use config::{ConfigError, ConfigGate, Credentials, Gate, MailgunConfig, MissingSetting};
pub use hook::{HookOutcome, MailgunHook};
pub use provider::{BatchMessage, MailgunApi, MessagesApi, ProviderError};
pub use recording::{BatchCall, RecordingClient};
pub use types::{EmailHeader, HeaderMap, MailAddress, ValidationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
