//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use subcast_common::AppError;

/// Header carrying the client session id.
pub const SESSION_HEADER: &str = "x-session-id";

const MAX_SESSION_LEN: usize = 128;

/// Opaque client session id, scoping unlock idempotency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::BadRequest("X-Session-Id header is required".to_string()))?;

        if value.len() > MAX_SESSION_LEN {
            return Err(AppError::BadRequest(format!(
                "X-Session-Id must be at most {MAX_SESSION_LEN} characters"
            )));
        }

        Ok(Self(value.to_string()))
    }
}
