//! Trending endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use subcast_common::AppResult;
use subcast_core::TrendingPair;
use validator::Validate;

use crate::{middleware::AppState, response::ApiResponse};

/// Trending request. Limits above the configured maximum are capped.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TrendingRequest {
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

/// Most active pairs, ranked by subcast count then recency.
async fn trending(
    State(state): State<AppState>,
    Json(req): Json<TrendingRequest>,
) -> AppResult<ApiResponse<Vec<TrendingPair>>> {
    req.validate()?;
    Ok(ApiResponse::ok(
        state.gateway.get_trending_pairs(req.limit).await,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(trending))
}
