//! Middleware and extractors for the REST API server.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use resurface_core::error::{ErrorCode, ResurfaceError};
use resurface_core::UserId;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::ApiError;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Create CORS middleware.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Request logging middleware.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    response
}

/// API key authentication middleware.
///
/// Accepts `Authorization: Bearer <key>` or `Token <key>`. An empty key
/// disables the check.
pub async fn auth_middleware(
    State(api_key): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !api_key.is_empty() {
        let token = request
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|header| {
                header
                    .strip_prefix("Bearer ")
                    .or_else(|| header.strip_prefix("Token "))
            });

        if token != Some(&*api_key) {
            return Err(ApiError::unauthorized("Invalid or missing API key"));
        }
    }

    Ok(next.run(request).await)
}

/// The user a request acts for, taken from the `X-User-Id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ResurfaceError::unauthenticated("missing X-User-Id header"))?;

        raw.to_str()
            .ok()
            .and_then(|value| value.parse::<UserId>().ok())
            .map(CurrentUser)
            .ok_or_else(|| {
                ResurfaceError::Unauthenticated {
                    message: "X-User-Id must be a positive integer".to_string(),
                    code: ErrorCode::AuthInvalidUser,
                }
                .into()
            })
    }
}
