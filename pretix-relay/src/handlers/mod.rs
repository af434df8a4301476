//! HTTP handlers for the relay.

pub mod health;
pub mod metrics;
pub mod test_push;
pub mod webhook;

pub use health::health_check;
pub use test_push::send_test_push;
pub use webhook::receive_webhook;

use service_core::error::AppError;

/// Fallback for the POST-only routes. The body is never read.
pub async fn post_only() -> AppError {
    AppError::MethodNotAllowed("Only POST method allowed".to_string())
}
