use axum::http::StatusCode;

/// Liveness probe. Does not touch the push provider.
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
