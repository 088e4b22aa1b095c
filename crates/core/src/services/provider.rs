//! Social-graph provider abstraction.
//!
//! The gateway talks to the upstream API only through this trait, so the
//! Neynar client and the in-memory graph are interchangeable.

use async_trait::async_trait;

use crate::models::{Cast, Fid, User};

/// Error type for provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The upstream answered with a non-success status.
    #[error("Upstream returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for logging.
        body: String,
    },
    /// The response did not match the expected shape.
    #[error("Malformed upstream response: {0}")]
    Malformed(String),
    /// The provider is not reachable at all.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Read access to a Farcaster social graph.
#[async_trait]
pub trait SocialGraphProvider: Send + Sync {
    /// Look up a user by handle. The handle is already normalized.
    ///
    /// Returns `Ok(None)` when no account has this handle.
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, ProviderError>;

    /// Look up several users at once. Unknown fids are simply absent.
    async fn users_by_fids(&self, fids: &[Fid]) -> Result<Vec<User>, ProviderError>;

    /// Recent casts authored by `fid`, newest first.
    async fn casts_by_author(&self, fid: Fid) -> Result<Vec<Cast>, ProviderError>;

    /// A window of recent network-wide casts used to rank trending pairs.
    async fn recent_casts(&self) -> Result<Vec<Cast>, ProviderError>;
}
