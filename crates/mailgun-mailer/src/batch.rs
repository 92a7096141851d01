//! Batch message construction and send
//!
//! Translates the host's raw mail parameters into one Mailgun batch message
//! and finalizes it. One call here means exactly one request to Mailgun,
//! whatever the number of recipients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::provider::{BatchMessage, MailgunApi, MessagesApi, ProviderError};
use crate::types::{validate_envelope, HeaderMap, MailAddress, ValidationError};

/// Response from a finalized batch message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReceipt {
    /// Message id assigned by Mailgun
    pub id: String,

    /// Number of recipients added to the batch
    pub recipients: usize,

    /// Timestamp when Mailgun accepted the message
    pub queued_at: DateTime<Utc>,
}

/// Send one batch message through `client`
///
/// Populates the message in a fixed order: from, subject, text body,
/// reply-to (from `Return-Path`), custom headers, recipients. `Return-Path`
/// becomes the reply-to address only; it is not forwarded as a custom
/// header. Provider failures are returned as-is, nothing is retried.
#[instrument(
    skip_all,
    fields(domain = %domain, to = recipients.len(), subject = %subject)
)]
pub async fn send_batch_message<C>(
    client: &C,
    domain: &str,
    headers: &HeaderMap,
    recipients: &[MailAddress],
    from: &MailAddress,
    subject: &str,
    body: &str,
) -> Result<BatchReceipt, MailgunError>
where
    C: MailgunApi + ?Sized,
{
    validate_envelope(from, recipients)?;

    let mut batch = client.messages().get_batch_message(domain);

    batch.set_from_address(&from.to_string());
    batch.set_subject(subject);
    batch.set_text_body(body);

    if let Some(reply_to) = headers.return_path() {
        batch.set_reply_to_address(reply_to);
    }

    for header in headers.custom() {
        debug!(header = %header.name, "Adding custom header");
        batch.add_custom_header(&header.name, &header.value);
    }

    for recipient in recipients {
        batch.add_to_recipient(&recipient.to_string());
    }

    let id = batch.finalize().await.map_err(|e| {
        error!(error = %e, "Mailgun batch send failed");
        MailgunError::Provider(e)
    })?;

    info!(message_id = %id, "Batch message sent");

    Ok(BatchReceipt {
        id,
        recipients: recipients.len(),
        queued_at: Utc::now(),
    })
}

/// Mailgun hook errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailgunError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Mailgun send failed: {0}")]
    Provider(#[from] ProviderError),
}
