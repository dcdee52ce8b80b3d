use crate::errors::AppError;
use crate::handlers::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Token filter for the management API.
///
/// The webhook and health routes are mounted outside this layer so the
/// platform can deliver events without the internal token.
pub async fn require_security_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("WMG-Security-Token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing WMG-Security-Token header".to_string()))?;

    if !constant_time_compare(token, &state.config.security_token) {
        tracing::warn!("Invalid security token received");
        return Err(AppError::Unauthorized("Invalid security token".to_string()));
    }

    Ok(next.run(request).await)
}

/// Constant-time string comparison (basic implementation)
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
