//! In-memory Mailgun client that records every call
//!
//! Nothing leaves the process. Useful for asserting exactly what the hook
//! asked Mailgun to do, in what order, and for simulating provider failures.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Credentials;
use crate::provider::{BatchMessage, MailgunApi, MessagesApi, ProviderError};

/// One call made against the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchCall {
    GetBatchMessage(String),
    SetFromAddress(String),
    SetSubject(String),
    SetTextBody(String),
    SetReplyToAddress(String),
    AddCustomHeader(String, String),
    AddToRecipient(String),
    Finalize,
}

#[derive(Debug, Default)]
struct Log {
    connections: Vec<Credentials>,
    messages_calls: usize,
    calls: Vec<BatchCall>,
    sent: usize,
    fail_with: Option<ProviderError>,
}

/// Recording stand-in for a Mailgun client
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingClient {
    log: Arc<Mutex<Log>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every `finalize` fails with `error`
    pub fn failing(error: ProviderError) -> Self {
        let client = Self::new();
        client.lock().fail_with = Some(error);
        client
    }

    /// Record a connection made with `credentials` and hand back a client
    /// sharing this log
    pub fn connect(&self, credentials: &Credentials) -> RecordingClient {
        self.lock().connections.push(credentials.clone());
        self.clone()
    }

    /// Client factory for [`MailgunHook::new`](crate::MailgunHook::new)
    pub fn connector(&self) -> impl Fn(&Credentials) -> RecordingClient + Clone + Send + Sync {
        let client = self.clone();
        move |credentials: &Credentials| client.connect(credentials)
    }

    /// Credentials of every connection, in order
    pub fn connections(&self) -> Vec<Credentials> {
        self.lock().connections.clone()
    }

    /// Number of times `messages()` was called
    pub fn messages_calls(&self) -> usize {
        self.lock().messages_calls
    }

    /// Every batch call, in order
    pub fn calls(&self) -> Vec<BatchCall> {
        self.lock().calls.clone()
    }

    pub fn finalize_calls(&self) -> usize {
        self.count(|c| matches!(c, BatchCall::Finalize))
    }

    /// Reply-to address of the last batch, if one was set
    pub fn reply_to(&self) -> Option<String> {
        self.lock().calls.iter().rev().find_map(|c| match c {
            BatchCall::SetReplyToAddress(address) => Some(address.clone()),
            _ => None,
        })
    }

    pub fn custom_headers(&self) -> Vec<(String, String)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BatchCall::AddCustomHeader(name, value) => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BatchCall::AddToRecipient(address) => Some(address.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&BatchCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    fn lock(&self) -> MutexGuard<'_, Log> {
        // A test that panicked mid-record leaves the log usable
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MailgunApi for RecordingClient {
    type Messages = RecordingMessages;

    fn messages(&self) -> RecordingMessages {
        self.lock().messages_calls += 1;
        RecordingMessages {
            client: self.clone(),
        }
    }
}

/// Messages endpoint of a [`RecordingClient`]
#[derive(Debug, Clone)]
pub struct RecordingMessages {
    client: RecordingClient,
}

impl MessagesApi for RecordingMessages {
    type Batch = RecordingBatch;

    fn get_batch_message(&self, domain: &str) -> RecordingBatch {
        self.client
            .lock()
            .calls
            .push(BatchCall::GetBatchMessage(domain.to_string()));
        RecordingBatch {
            client: self.client.clone(),
        }
    }
}

/// Batch message handed out by a [`RecordingClient`]
#[derive(Debug)]
pub struct RecordingBatch {
    client: RecordingClient,
}

impl RecordingBatch {
    fn record(&self, call: BatchCall) {
        self.client.lock().calls.push(call);
    }
}

impl BatchMessage for RecordingBatch {
    fn set_from_address(&mut self, address: &str) {
        self.record(BatchCall::SetFromAddress(address.to_string()));
    }

    fn set_subject(&mut self, subject: &str) {
        self.record(BatchCall::SetSubject(subject.to_string()));
    }

    fn set_text_body(&mut self, body: &str) {
        self.record(BatchCall::SetTextBody(body.to_string()));
    }

    fn set_reply_to_address(&mut self, address: &str) {
        self.record(BatchCall::SetReplyToAddress(address.to_string()));
    }

    fn add_custom_header(&mut self, name: &str, value: &str) {
        self.record(BatchCall::AddCustomHeader(name.to_string(), value.to_string()));
    }

    fn add_to_recipient(&mut self, address: &str) {
        self.record(BatchCall::AddToRecipient(address.to_string()));
    }

    fn finalize(self) -> impl Future<Output = Result<String, ProviderError>> + Send {
        let result = {
            let mut log = self.client.lock();
            log.calls.push(BatchCall::Finalize);
            match log.fail_with.clone() {
                Some(err) => Err(err),
                None => {
                    log.sent += 1;
                    Ok(format!("<recorded.{}@mailgun.test>", log.sent))
                }
            }
        };
        async move { result }
    }
}
