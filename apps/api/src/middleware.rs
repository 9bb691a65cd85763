use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use zeroline_core::AppError;

use crate::error::ApiResult;
use crate::state::AppState;

/// Rejects requests whose `x-api-key` header does not match the
/// configured operator key. Device registration stays outside this
/// layer: the enrollment token is the credential there.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let presented = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if presented.is_empty() || presented != state.api_key {
        return Err(AppError::Unauthorized("invalid API key".to_owned()).into());
    }

    Ok(next.run(request).await)
}
