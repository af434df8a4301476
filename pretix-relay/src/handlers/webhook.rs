use axum::{extract::State, http::StatusCode};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::utils::signature::verify_shared_secret;

use crate::models::PretixWebhook;
use crate::services::{record_push, record_webhook, PushMessage};
use crate::startup::AppState;

/// Pretix webhook receiver.
///
/// Decodes the order notification, derives a title/body pair and broadcasts
/// it to the configured FCM topic.
#[tracing::instrument(skip(state, body))]
pub async fn receive_webhook(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, &'static str), AppError> {
    let webhook = PretixWebhook::from_json(&body).map_err(|e| {
        tracing::warn!(error = %e, "Error parsing webhook payload");
        AppError::BadRequest(anyhow::anyhow!("Error parsing payload"))
    })?;

    if let Some(expected) = &state.config.webhook.secret {
        if !verify_shared_secret(expected.expose_secret(), webhook.secret.as_deref()) {
            tracing::warn!(
                organizer = %webhook.organizer,
                event = %webhook.event,
                "Rejected webhook with missing or invalid secret"
            );
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Invalid webhook secret"
            )));
        }
    }

    tracing::info!(
        organizer = %webhook.organizer,
        event = %webhook.event,
        action = %webhook.action,
        order = %webhook.code,
        status = webhook.status.as_deref().unwrap_or(""),
        "Received webhook"
    );
    record_webhook(&webhook.action);

    let message = PushMessage::for_webhook(&webhook, &state.config.fcm.topic);

    match state.push_provider.send(&message).await {
        Ok(response) => {
            record_push(message.target.kind(), "sent");
            tracing::info!(
                message_id = %response.message_id,
                order = %webhook.code,
                "FCM message sent successfully"
            );
            Ok((StatusCode::OK, "Webhook processed successfully"))
        }
        Err(e) => {
            record_push(message.target.kind(), "failed");
            tracing::error!(
                error = %e,
                order = %webhook.code,
                "Error sending FCM notification"
            );
            Err(AppError::InternalError(anyhow::anyhow!(
                "Error processing webhook"
            )))
        }
    }
}
