pub mod credentials;
pub mod push;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use credentials::ServiceAccountKey;
pub use push::{FcmProvider, MockPushProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Send error: {0}")]
    SendFailed(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderResponse {
    /// Provider-assigned message name, e.g. `projects/p/messages/123`.
    pub message_id: String,
}

/// Where a push message is delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum PushTarget {
    /// Broadcast to every device subscribed to the topic.
    Topic(String),
    /// Direct delivery to a single registered device.
    Token(String),
}

impl PushTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            PushTarget::Topic(_) => "topic",
            PushTarget::Token(_) => "token",
        }
    }

    /// Target rendered for logs. Device tokens are truncated.
    pub fn redacted(&self) -> String {
        match self {
            PushTarget::Topic(topic) => format!("topic:{}", topic),
            PushTarget::Token(token) => format!("token:{}", redact_token(token)),
        }
    }
}

pub fn redact_token(token: &str) -> String {
    match token.char_indices().nth(10) {
        Some((idx, _)) => format!("{}...", &token[..idx]),
        None => format!("{}...", token),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub target: PushTarget,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError>;
    async fn health_check(&self) -> Result<(), ProviderError>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_long_tokens() {
        assert_eq!(redact_token("abcdefghijklmnop"), "abcdefghij...");
    }

    #[test]
    fn redacts_short_tokens_without_panicking() {
        assert_eq!(redact_token("abc"), "abc...");
        assert_eq!(redact_token(""), "...");
    }

    #[test]
    fn target_kind_and_rendering() {
        let topic = PushTarget::Topic("pretix-orders".to_string());
        assert_eq!(topic.kind(), "topic");
        assert_eq!(topic.redacted(), "topic:pretix-orders");

        let token = PushTarget::Token("fGx1-device-token-value".to_string());
        assert_eq!(token.kind(), "token");
        assert_eq!(token.redacted(), "token:fGx1-devic...");
    }
}
