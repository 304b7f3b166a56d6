//! Validated publish topic
//!
//! A publish topic names exactly one destination on the broker, so it must be
//! non-empty, fit in a 16-bit length prefix, and carry no wildcard or NUL
//! characters. Topics are kept verbatim: leading/trailing whitespace and
//! empty levels (`a//b`) are legal topic text and are not normalised.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Maximum encoded length of a topic (16-bit length prefix on the wire)
const MAX_TOPIC_BYTES: usize = 65_535;

/// Single-level wildcard, only valid in subscription filters
const SINGLE_LEVEL_WILDCARD: char = '+';

/// Multi-level wildcard, only valid in subscription filters
const MULTI_LEVEL_WILDCARD: char = '#';

/// A validated publish topic (non-empty, <=65535 bytes, no wildcards, no NUL)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Create a new validated topic.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if:
    /// - The topic is empty
    /// - The topic exceeds 65535 bytes
    /// - The topic contains `+`, `#` or a NUL character
    pub fn new(topic: impl Into<String>) -> Result<Self, DomainError> {
        let topic = topic.into();
        if topic.is_empty() {
            return Err(DomainError::validation("Topic cannot be empty"));
        }
        if topic.len() > MAX_TOPIC_BYTES {
            return Err(DomainError::validation(format!(
                "Topic cannot exceed {} bytes",
                MAX_TOPIC_BYTES
            )));
        }
        if topic.contains('\0') {
            return Err(DomainError::validation("Topic cannot contain NUL"));
        }
        if topic.contains([SINGLE_LEVEL_WILDCARD, MULTI_LEVEL_WILDCARD]) {
            return Err(DomainError::validation(format!(
                "Publish topic cannot contain wildcards: {}",
                topic
            )));
        }
        Ok(Self(topic))
    }

    /// Returns the topic as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Topic {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> String {
        topic.0
    }
}
