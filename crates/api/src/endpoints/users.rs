//! User endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use subcast_common::{AppError, AppResult};
use subcast_core::{Fid, User};
use validator::Validate;

use crate::{middleware::AppState, response::ApiResponse};

/// Show user request. Exactly one of `username` and `fid` is used; `fid`
/// wins when both are present.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShowUserRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: Option<String>,
    pub fid: Option<Fid>,
}

/// Get a user by handle or fid. `data` is null when nobody matches.
async fn show(
    State(state): State<AppState>,
    Json(req): Json<ShowUserRequest>,
) -> AppResult<ApiResponse<Option<User>>> {
    req.validate()?;

    let user = if let Some(fid) = req.fid {
        state.gateway.resolve_user_by_id(fid).await
    } else if let Some(username) = req.username {
        state.gateway.resolve_user_by_handle(&username).await
    } else {
        return Err(AppError::BadRequest(
            "Either username or fid is required".to_string(),
        ));
    };

    Ok(ApiResponse::ok(user))
}

/// Bulk lookup request.
#[derive(Debug, Deserialize, Validate)]
pub struct LookupUsersRequest {
    #[validate(length(max = 100))]
    pub fids: Vec<Fid>,
}

/// Resolve several users at once. Unknown fids are left out.
async fn lookup(
    State(state): State<AppState>,
    Json(req): Json<LookupUsersRequest>,
) -> AppResult<ApiResponse<Vec<User>>> {
    req.validate()?;
    Ok(ApiResponse::ok(
        state.gateway.resolve_users_by_ids(&req.fids).await,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/show", post(show))
        .route("/lookup", post(lookup))
}
