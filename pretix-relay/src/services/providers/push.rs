use super::{
    ProviderError, ProviderResponse, PushMessage, PushProvider, PushTarget, ServiceAccountKey,
};
use crate::config::FcmConfig;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::RwLock;

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Firebase Cloud Messaging HTTP v1 client.
///
/// Built once at startup and shared across requests. The OAuth2 access token
/// is minted from the service-account key and reused until shortly before it
/// expires.
pub struct FcmProvider {
    config: FcmConfig,
    credentials: ServiceAccountKey,
    signing_key: EncodingKey,
    client: Client,
    token: RwLock<Option<CachedToken>>,
}

struct CachedToken {
    value: Secret<String>,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Serialize)]
struct FcmRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<&'a str>,
    notification: FcmNotification<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FcmErrorEnvelope {
    error: FcmError,
}

#[derive(Debug, Deserialize)]
struct FcmError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl FcmProvider {
    pub fn new(config: FcmConfig, credentials: ServiceAccountKey) -> Result<Self, ProviderError> {
        let signing_key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| {
                ProviderError::Configuration(format!(
                    "Failed to parse service account private key: {}",
                    e
                ))
            })?;

        Ok(Self {
            config,
            credentials,
            signing_key,
            client: Client::new(),
            token: RwLock::new(None),
        })
    }

    /// Load the service-account key named in the config and build the client.
    pub fn from_config(config: FcmConfig) -> Result<Self, ProviderError> {
        let credentials = ServiceAccountKey::from_file(&config.service_account_path)?;

        if let Some(key_project) = credentials.project_id.as_deref() {
            if key_project != config.project_id {
                tracing::warn!(
                    configured_project = %config.project_id,
                    key_project = %key_project,
                    "Service account belongs to a different project than FCM_PROJECT_ID"
                );
            }
        }

        Self::new(config, credentials)
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.project_id
        )
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
                return Ok(token.value.expose_secret().clone());
            }
        }

        let mut cached = self.token.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value.expose_secret().clone());
        }

        let fresh = self.fetch_access_token().await?;
        let value = fresh.value.expose_secret().clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn fetch_access_token(&self) -> Result<CachedToken, ProviderError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &self.credentials.client_email,
            scope: FCM_SCOPE,
            aud: &self.credentials.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.credentials.private_key_id.clone();

        let assertion = encode(&header, &claims, &self.signing_key).map_err(|e| {
            ProviderError::Authentication(format!("Failed to sign token assertion: {}", e))
        })?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!("Failed to reach token endpoint: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(format!(
                "Token endpoint returned error status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ProviderError::Authentication(format!("Failed to parse token response: {}", e))
        })?;

        tracing::debug!(expires_in = token.expires_in, "Obtained FCM access token");

        Ok(CachedToken {
            value: Secret::new(token.access_token),
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match serde_json::from_str::<FcmErrorEnvelope>(body) {
        Ok(envelope) => {
            let detail = format!(
                "FCM error ({}): {}",
                envelope.error.status, envelope.error.message
            );
            match envelope.error.status.as_str() {
                "NOT_FOUND" | "INVALID_ARGUMENT" | "UNREGISTERED" => {
                    ProviderError::InvalidRecipient(detail)
                }
                "UNAUTHENTICATED" | "PERMISSION_DENIED" => ProviderError::Authentication(detail),
                _ => ProviderError::SendFailed(detail),
            }
        }
        Err(_) => ProviderError::SendFailed(format!(
            "FCM API returned error status {}: {}",
            status, body
        )),
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
        let access_token = self.access_token().await?;

        let (token, topic) = match &push.target {
            PushTarget::Token(token) => (Some(token.as_str()), None),
            PushTarget::Topic(topic) => (None, Some(topic.as_str())),
        };

        let request = FcmRequest {
            message: FcmMessage {
                token,
                topic,
                notification: FcmNotification {
                    title: &push.title,
                    body: &push.body,
                },
                data: Some(&push.data).filter(|data| !data.is_empty()),
            },
        };

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(&access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("Failed to connect to FCM: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        let fcm_response: FcmResponse = response.json().await.map_err(|e| {
            ProviderError::SendFailed(format!("Failed to parse FCM response: {}", e))
        })?;

        tracing::info!(
            target_kind = push.target.kind(),
            recipient = %push.target.redacted(),
            message_id = %fcm_response.name,
            "Push notification sent via FCM"
        );

        Ok(ProviderResponse {
            message_id: fcm_response.name,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.project_id.is_empty() {
            return Err(ProviderError::Configuration(
                "FCM project_id is not configured".to_string(),
            ));
        }

        if self.credentials.client_email.is_empty() {
            return Err(ProviderError::Configuration(
                "Service account client_email is empty".to_string(),
            ));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}

/// Push provider that records messages instead of sending them.
///
/// Used by tests and by `FCM_DRY_RUN` deployments.
pub struct MockPushProvider {
    fail_with: Option<String>,
    send_count: AtomicU64,
    last_message: Mutex<Option<PushMessage>>,
}

impl MockPushProvider {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            send_count: AtomicU64::new(0),
            last_message: Mutex::new(None),
        }
    }

    /// A provider whose every send fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::new()
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn last_message(&self) -> Option<PushMessage> {
        self.last_message
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

impl Default for MockPushProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);

        if let Ok(mut guard) = self.last_message.lock() {
            *guard = Some(push.clone());
        }

        if let Some(message) = &self.fail_with {
            return Err(ProviderError::SendFailed(message.clone()));
        }

        tracing::info!(
            recipient = %push.target.redacted(),
            title = %push.title,
            "[MOCK] Push notification would be sent"
        );

        Ok(ProviderResponse {
            message_id: format!("mock-push-{}", self.send_count()),
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
