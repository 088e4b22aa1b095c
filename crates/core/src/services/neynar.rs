//! Neynar v2 HTTP client.
//!
//! Implements [`SocialGraphProvider`] against the hosted Farcaster API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use subcast_common::NeynarConfig;
use tracing::debug;
use url::Url;

use crate::convert::{
    CastsEnvelope, UserEnvelope, UsersEnvelope, cast_from_remote, user_from_remote,
};
use crate::models::{Cast, Fid, User};
use crate::services::provider::{ProviderError, SocialGraphProvider};

/// Neynar caps `/user/bulk` at 100 fids per request.
const BULK_LOOKUP_LIMIT: usize = 100;

/// Largest page `/feed/user/casts` serves.
const USER_CASTS_PAGE_LIMIT: usize = 150;

/// Largest page `/feed/trending` serves.
const TRENDING_PAGE_LIMIT: usize = 10;

/// Neynar v2 API client.
#[derive(Clone)]
pub struct NeynarClient {
    client: Client,
    base_url: String,
    api_key: String,
    casts_per_user: usize,
    trending_window: usize,
}

impl NeynarClient {
    /// Create a new client from configuration.
    pub fn new(config: &NeynarConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::Unavailable("Neynar API key is not set".to_string()))?;

        Url::parse(&config.base_url)
            .map_err(|e| ProviderError::Unavailable(format!("invalid base URL: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(format!("subcast-pulse/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            casts_per_user: config.casts_per_user,
            trending_window: config.trending_window,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Query for the next `/feed/trending` page, given how many casts are
    /// still wanted.
    fn trending_query(remaining: usize, cursor: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![(
            "limit",
            remaining.clamp(1, TRENDING_PAGE_LIMIT).to_string(),
        )];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        query
    }

    /// GET `path` and decode the JSON body. `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ProviderError> {
        let url = self.endpoint(path);
        debug!(url = %url, "Querying Neynar");

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("x-api-key", &self.api_key)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

#[async_trait]
impl SocialGraphProvider for NeynarClient {
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, ProviderError> {
        let envelope: Option<UserEnvelope> = self
            .get_json("/user/by_username", &[("username", username.to_string())])
            .await?;

        Ok(envelope.map(|e| user_from_remote(e.user)))
    }

    async fn users_by_fids(&self, fids: &[Fid]) -> Result<Vec<User>, ProviderError> {
        let mut users = Vec::with_capacity(fids.len());

        for chunk in fids.chunks(BULK_LOOKUP_LIMIT) {
            let joined = chunk
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");

            let envelope: Option<UsersEnvelope> =
                self.get_json("/user/bulk", &[("fids", joined)]).await?;

            if let Some(envelope) = envelope {
                users.extend(envelope.users.into_iter().map(user_from_remote));
            }
        }

        Ok(users)
    }

    async fn casts_by_author(&self, fid: Fid) -> Result<Vec<Cast>, ProviderError> {
        let envelope: Option<CastsEnvelope> = self
            .get_json(
                "/feed/user/casts",
                &[
                    ("fid", fid.to_string()),
                    (
                        "limit",
                        self.casts_per_user
                            .clamp(1, USER_CASTS_PAGE_LIMIT)
                            .to_string(),
                    ),
                    ("include_replies", "true".to_string()),
                ],
            )
            .await?;

        Ok(envelope
            .map(|e| e.casts.into_iter().map(cast_from_remote).collect())
            .unwrap_or_default())
    }

    async fn recent_casts(&self) -> Result<Vec<Cast>, ProviderError> {
        let mut casts = Vec::with_capacity(self.trending_window);
        let mut cursor: Option<String> = None;

        while casts.len() < self.trending_window {
            let query = Self::trending_query(self.trending_window - casts.len(), cursor.as_deref());
            let Some(page) = self
                .get_json::<CastsEnvelope>("/feed/trending", &query)
                .await?
            else {
                break;
            };

            let next = page.next_cursor().map(str::to_string);
            if page.casts.is_empty() {
                break;
            }
            casts.extend(page.casts.into_iter().map(cast_from_remote));

            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        casts.truncate(self.trending_window);
        debug!(count = casts.len(), "Collected trending window");
        Ok(casts)
    }
}
