//! Conversation endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use subcast_common::{AppError, AppResult};
use subcast_core::{Fid, SortOrder, Subcast};

use crate::{middleware::AppState, response::ApiResponse};

/// Show conversation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowConversationRequest {
    pub fid_a: Fid,
    pub fid_b: Fid,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Conversation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub subcasts: Vec<Subcast>,
    pub count: usize,
}

/// Every subcast exchanged between two users.
async fn show(
    State(state): State<AppState>,
    Json(req): Json<ShowConversationRequest>,
) -> AppResult<ApiResponse<ConversationResponse>> {
    if req.fid_a == req.fid_b {
        return Err(AppError::BadRequest(
            "fidA and fidB must be different users".to_string(),
        ));
    }

    let mut subcasts = state.gateway.get_conversation(req.fid_a, req.fid_b).await;
    state.gateway.attach_users(&mut subcasts).await;
    req.sort.sort(&mut subcasts);

    Ok(ApiResponse::ok(ConversationResponse {
        count: subcasts.len(),
        subcasts,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/show", post(show))
}
