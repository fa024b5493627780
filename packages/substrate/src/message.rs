//! Messages delivered over subject-based publish/subscribe.

use std::collections::HashMap;

use bytes::Bytes;

/// A message published to, or delivered from, a subject.
///
/// Subjects are hierarchical `.`-separated strings. A message carrying a
/// reply subject is a request; publishing to that reply subject answers it.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Subject the message was published to.
    pub subject: String,
    /// Reply subject for request/reply exchanges, if any.
    pub reply: Option<String>,
    /// Opaque payload bytes.
    pub payload: Bytes,
    /// Header map; empty for most messages.
    pub headers: HashMap<String, String>,
}

impl Message {
    /// Create a message with a payload and no reply subject or headers.
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            reply: None,
            payload: payload.into(),
            headers: HashMap::new(),
        }
    }

    /// Look up a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}
