use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use subtle::ConstantTimeEq;

use crate::AppState;

/// Require `Authorization: Bearer <HOOK_SHARED_SECRET>` when a secret is configured.
pub async fn hook_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.hook_secret.as_ref() else {
        return Ok(next.run(req).await);
    };

    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let authorized = presented
        .map(|token| bool::from(token.as_bytes().ct_eq(expected.expose_secret().as_bytes())))
        .unwrap_or(false);

    if !authorized {
        tracing::warn!(
            has_credentials = presented.is_some(),
            "Rejected hook invocation with invalid shared secret"
        );
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Missing or invalid hook credentials"
        )));
    }

    Ok(next.run(req).await)
}
