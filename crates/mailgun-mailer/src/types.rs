//! Mail parameter types handed to the hook by the host mail pipeline
//!
//! Addresses and headers arrive here exactly as the host built them; the
//! only interpretation this crate applies is pulling `Return-Path` out as the
//! reply-to address.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Header carrying the address replies should go to
pub const RETURN_PATH: &str = "Return-Path";

/// An email address with an optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailAddress {
    /// Bare address (`user@example.com`)
    pub address: String,

    /// Display name (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MailAddress {
    /// Create an address without a display name
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    /// Create an address with a display name
    pub fn with_name(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: Some(name.into()),
        }
    }

    /// Check the bare address is syntactically valid
    pub fn is_valid(&self) -> bool {
        is_valid_email(&self.address)
    }
}

impl fmt::Display for MailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => write!(f, "{} <{}>", name, self.address),
            _ => f.write_str(&self.address),
        }
    }
}

impl From<&str> for MailAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Custom email header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailHeader {
    pub name: String,
    pub value: String,
}

/// Outgoing message headers, keyed by name as provided (case-sensitive)
///
/// Keeps insertion order so custom headers reach the provider in the order
/// the host added them. Inserting a name that is already present replaces
/// its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderMap {
    headers: Vec<EmailHeader>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, returning the previous value if the name was taken
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();

        match self.headers.iter_mut().find(|h| h.name == name) {
            Some(existing) => Some(std::mem::replace(&mut existing.value, value)),
            None => {
                self.headers.push(EmailHeader { name, value });
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }

    /// The `Return-Path` value, used as the reply-to address
    pub fn return_path(&self) -> Option<&str> {
        self.get(RETURN_PATH)
    }

    /// Every header except `Return-Path`, in insertion order
    pub fn custom(&self) -> impl Iterator<Item = &EmailHeader> {
        self.headers.iter().filter(|h| h.name != RETURN_PATH)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmailHeader> {
        self.headers.iter()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut map = HeaderMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
}

/// Check the sender and recipients before anything is handed to the provider
pub fn validate_envelope(from: &MailAddress, to: &[MailAddress]) -> Result<(), ValidationError> {
    if from.address.is_empty() {
        return Err(ValidationError::MissingField("from"));
    }
    if !from.is_valid() {
        return Err(ValidationError::InvalidEmail(from.address.clone()));
    }

    if to.is_empty() {
        return Err(ValidationError::MissingField("to"));
    }
    for recipient in to {
        if !recipient.is_valid() {
            return Err(ValidationError::InvalidEmail(recipient.address.clone()));
        }
    }

    Ok(())
}

/// Check if email address is valid
fn is_valid_email(email: &str) -> bool {
    email_address::EmailAddress::is_valid(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mail_address_display() {
        assert_eq!(MailAddress::new("a@example.com").to_string(), "a@example.com");
        assert_eq!(
            MailAddress::with_name("a@example.com", "Alice").to_string(),
            "Alice <a@example.com>"
        );
        // An empty display name is not worth the angle brackets
        assert_eq!(
            MailAddress::with_name("a@example.com", "").to_string(),
            "a@example.com"
        );
    }

    #[test]
    fn test_header_map_replaces_in_place() {
        let mut headers = HeaderMap::new();
        assert_eq!(headers.insert("X-Mailer", "one"), None);
        headers.insert("List-Unsubscribe", "<mailto:u@example.com>");
        assert_eq!(headers.insert("X-Mailer", "two"), Some("one".to_string()));

        let names: Vec<&str> = headers.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["X-Mailer", "List-Unsubscribe"]);
        assert_eq!(headers.get("X-Mailer"), Some("two"));
    }

    #[test]
    fn test_header_names_are_case_sensitive() {
        let headers: HeaderMap = [("return-path", "lower@example.com")].into_iter().collect();
        assert_eq!(headers.return_path(), None);
        assert_eq!(headers.custom().count(), 1);
    }

    #[test]
    fn test_custom_headers_skip_return_path() {
        let headers: HeaderMap = [
            ("Return-Path", "bounce@example.com"),
            ("X-Mailer", "wiki"),
        ]
        .into_iter()
        .collect();

        assert_eq!(headers.return_path(), Some("bounce@example.com"));
        let custom: Vec<&EmailHeader> = headers.custom().collect();
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0].name, "X-Mailer");
    }

    #[test]
    fn test_header_map_serializes_as_list() {
        let headers: HeaderMap = [("X-Mailer", "wiki")].into_iter().collect();
        let json = serde_json::to_string(&headers).unwrap();
        assert_eq!(json, r#"[{"name":"X-Mailer","value":"wiki"}]"#);
    }

    #[test]
    fn test_validate_envelope() {
        let from = MailAddress::new("sender@example.com");
        let to = vec![MailAddress::new("receiver@example.com")];
        assert!(validate_envelope(&from, &to).is_ok());

        assert_eq!(
            validate_envelope(&from, &[]),
            Err(ValidationError::MissingField("to"))
        );
        assert_eq!(
            validate_envelope(&MailAddress::new(""), &to),
            Err(ValidationError::MissingField("from"))
        );
        assert_eq!(
            validate_envelope(&from, &[MailAddress::new("not-an-address")]),
            Err(ValidationError::InvalidEmail("not-an-address".to_string()))
        );
    }
}
