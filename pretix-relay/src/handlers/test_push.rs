use axum::{extract::State, Json};
use serde::Serialize;
use service_core::error::AppError;
use validator::Validate;

use crate::models::TestPushRequest;
use crate::services::{providers::redact_token, record_push, PushMessage};
use crate::startup::AppState;

#[derive(Debug, Serialize)]
pub struct TestPushResponse {
    pub status: String,
    pub message_id: String,
    pub message: String,
}

/// Send a single push straight to a device token, bypassing the topic.
#[tracing::instrument(skip(state, body))]
pub async fn send_test_push(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<TestPushResponse>, AppError> {
    let request = TestPushRequest::from_json(&body).map_err(|e| {
        tracing::warn!(error = %e, "Invalid test push payload");
        AppError::BadRequest(anyhow::anyhow!("Invalid JSON payload"))
    })?;
    request.validate()?;

    let message = PushMessage::test_message(
        &request.token,
        request.title.as_deref(),
        request.message.as_deref(),
    );

    let response = state.push_provider.send(&message).await.map_err(|e| {
        record_push(message.target.kind(), "failed");
        tracing::error!(error = %e, "Error sending test FCM message");
        AppError::InternalError(anyhow::anyhow!("Failed to send message: {}", e))
    })?;
    record_push(message.target.kind(), "sent");

    tracing::info!(
        token = %redact_token(&request.token),
        message_id = %response.message_id,
        "Test FCM message sent successfully"
    );

    Ok(Json(TestPushResponse {
        status: "success".to_string(),
        message_id: response.message_id,
        message: "Test message sent successfully".to_string(),
    }))
}
