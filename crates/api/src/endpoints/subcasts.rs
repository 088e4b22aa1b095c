//! Subcast unlock endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use subcast_common::AppResult;
use subcast_core::{UnlockFee, UnlockReceipt};
use tracing::debug;
use validator::Validate;

use crate::{extractors::SessionId, middleware::AppState, response::ApiResponse};

/// The fee charged per unlock.
async fn unlock_fee(State(state): State<AppState>) -> ApiResponse<UnlockFee> {
    ApiResponse::ok(state.unlock_service.fee().clone())
}

/// Unlock request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UnlockRequest {
    #[validate(length(min = 1, max = 128))]
    pub cast_hash: String,
}

/// Pay to reveal the original text of a deleted subcast.
///
/// Repeating the call in the same session returns the same receipt without
/// charging again.
async fn unlock(
    SessionId(session_id): SessionId,
    State(state): State<AppState>,
    Json(req): Json<UnlockRequest>,
) -> AppResult<ApiResponse<UnlockReceipt>> {
    req.validate()?;
    debug!(session = %session_id, cast_hash = %req.cast_hash, "Unlock requested");

    let receipt = state
        .unlock_service
        .unlock(&session_id, &req.cast_hash)
        .await?;

    Ok(ApiResponse::ok(receipt))
}

/// End session response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionResponse {
    pub cleared: usize,
}

/// Forget every unlock of the calling session, pending charges included.
async fn end_session(
    SessionId(session_id): SessionId,
    State(state): State<AppState>,
) -> ApiResponse<EndSessionResponse> {
    let cleared = state.unlock_service.end_session(&session_id).await;
    ApiResponse::ok(EndSessionResponse { cleared })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/unlock-fee", post(unlock_fee))
        .route("/unlock", post(unlock))
        .route("/end-session", post(end_session))
}
