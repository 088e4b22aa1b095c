//! API endpoints.

mod conversations;
mod subcasts;
mod trending;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/conversations", conversations::router())
        .nest("/trending", trending::router())
        .nest("/subcasts", subcasts::router())
}
