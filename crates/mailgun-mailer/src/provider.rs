//! The slice of the Mailgun client this crate talks to
//!
//! Hosts wrap their Mailgun SDK client in these traits. Transport,
//! authentication and retries stay on the client's side of the seam.

use std::future::Future;

/// Top-level Mailgun API handle
pub trait MailgunApi {
    type Messages: MessagesApi;

    /// The messages endpoint group
    fn messages(&self) -> Self::Messages;
}

/// Messages endpoint group
pub trait MessagesApi {
    type Batch: BatchMessage;

    /// Start a batch message scoped to a sending domain
    fn get_batch_message(&self, domain: &str) -> Self::Batch;
}

/// A batch message under construction
///
/// Each `add_to_recipient` call adds a distinct recipient. `finalize` takes
/// the message by value: once sent it cannot be touched or sent again.
pub trait BatchMessage {
    fn set_from_address(&mut self, address: &str);

    fn set_subject(&mut self, subject: &str);

    fn set_text_body(&mut self, body: &str);

    fn set_reply_to_address(&mut self, address: &str);

    fn add_custom_header(&mut self, name: &str, value: &str);

    fn add_to_recipient(&mut self, address: &str);

    /// Send the message, resolving to the provider's message id
    fn finalize(self) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// Errors raised by the provider client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Mailgun rejected the API key")]
    Unauthorized,

    #[error("Mailgun rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
}
