//! HTTP API layer for subcast-pulse.
//!
//! JSON endpoints over the conversation gateway and the unlock service:
//!
//! - **Users**: handle and fid lookups
//! - **Conversations**: the subcast feed of a pair
//! - **Trending**: most active pairs
//! - **Subcasts**: fee disclosure, paid unlock of deleted text and session teardown
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
