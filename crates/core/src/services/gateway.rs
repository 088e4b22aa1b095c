//! Conversation data gateway.
//!
//! Read façade used by the presentation layer. Upstream failures of any kind
//! are logged and turned into empty results: a display surface should show
//! "nothing here" rather than fail.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use subcast_common::FeedConfig;
use tracing::{debug, warn};

use crate::handle::normalize_handle;
use crate::models::{Cast, Fid, Subcast, TrendingPair, User};
use crate::services::provider::SocialGraphProvider;
use crate::subcasts::{PairActivity, build_conversation, rank_pairs, sort_by_activity};

/// Shared provider handle.
pub type Provider = Arc<dyn SocialGraphProvider>;

/// Gateway over a [`SocialGraphProvider`].
#[derive(Clone)]
pub struct ConversationDataGateway {
    provider: Provider,
    trending_default_limit: usize,
    trending_max_limit: usize,
}

impl ConversationDataGateway {
    /// Create a new gateway.
    #[must_use]
    pub fn new(provider: Provider, config: &FeedConfig) -> Self {
        Self {
            provider,
            trending_default_limit: config.trending_default_limit,
            trending_max_limit: config.trending_max_limit.max(1),
        }
    }

    /// Resolve a user by handle, with or without a leading `@`.
    pub async fn resolve_user_by_handle(&self, handle: &str) -> Option<User> {
        let Some(username) = normalize_handle(handle) else {
            debug!(handle = %handle, "Ignoring lookup for invalid handle");
            return None;
        };

        match self.provider.user_by_username(&username).await {
            Ok(user) => user,
            Err(e) => {
                warn!(username = %username, error = %e, "User lookup failed");
                None
            }
        }
    }

    /// Resolve a user by fid.
    pub async fn resolve_user_by_id(&self, fid: Fid) -> Option<User> {
        self.resolve_users_by_ids(&[fid])
            .await
            .into_iter()
            .find(|u| u.fid == fid)
    }

    /// Resolve several users in one upstream round trip.
    pub async fn resolve_users_by_ids(&self, fids: &[Fid]) -> Vec<User> {
        if fids.is_empty() {
            return Vec::new();
        }

        let mut unique = fids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        match self.provider.users_by_fids(&unique).await {
            Ok(users) => users,
            Err(e) => {
                warn!(fids = ?unique, error = %e, "Bulk user lookup failed");
                Vec::new()
            }
        }
    }

    /// All subcasts exchanged between `fid_a` and `fid_b`, newest first.
    ///
    /// Deleted subcasts are included with their text redacted.
    pub async fn get_conversation(&self, fid_a: Fid, fid_b: Fid) -> Vec<Subcast> {
        if fid_a == fid_b {
            return Vec::new();
        }

        let (from_a, from_b) = futures::join!(
            self.provider.casts_by_author(fid_a),
            self.provider.casts_by_author(fid_b)
        );

        let (from_a, from_b) = match (from_a, from_b) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => {
                warn!(fid_a, fid_b, error = %e, "Conversation fetch failed");
                return Vec::new();
            }
        };

        let conversation = build_conversation(fid_a, fid_b, from_a.into_iter().chain(from_b));
        debug!(fid_a, fid_b, count = conversation.len(), "Built conversation");
        conversation
    }

    /// Resolve the author and mentioned users of each subcast with one batched
    /// lookup. Users that cannot be resolved are left out.
    pub async fn attach_users(&self, subcasts: &mut [Subcast]) {
        let fids: Vec<Fid> = subcasts
            .iter()
            .flat_map(|s| std::iter::once(s.fid).chain(s.mentioned_fids.iter().copied()))
            .collect();
        let users: HashMap<Fid, User> = self
            .resolve_users_by_ids(&fids)
            .await
            .into_iter()
            .map(|u| (u.fid, u))
            .collect();

        for subcast in subcasts {
            subcast.author = users.get(&subcast.fid).cloned();
            subcast.mentioned = Some(
                subcast
                    .mentioned_fids
                    .iter()
                    .filter_map(|fid| users.get(fid).cloned())
                    .collect(),
            );
        }
    }

    /// Currently trending pairs, most active first.
    ///
    /// Candidates come from the provider's recent-casts window. Each
    /// candidate is then recounted from the same per-author history that
    /// [`Self::get_conversation`] reads, so a pair's count, last activity and
    /// reciprocity match its feed. `limit` defaults to the configured value
    /// and is capped at the configured maximum.
    pub async fn get_trending_pairs(&self, limit: Option<usize>) -> Vec<TrendingPair> {
        let limit = limit
            .unwrap_or(self.trending_default_limit)
            .min(self.trending_max_limit);
        if limit == 0 {
            return Vec::new();
        }

        let casts = match self.provider.recent_casts().await {
            Ok(casts) => casts,
            Err(e) => {
                warn!(error = %e, "Trending cast fetch failed");
                return Vec::new();
            }
        };

        let candidates = rank_pairs(casts);
        if candidates.is_empty() {
            return Vec::new();
        }

        let fids: Vec<Fid> = candidates
            .iter()
            .flat_map(|pair| [pair.fids.0, pair.fids.1])
            .collect();
        let users: HashMap<Fid, User> = self
            .resolve_users_by_ids(&fids)
            .await
            .into_iter()
            .map(|u| (u.fid, u))
            .collect();

        let candidates: Vec<PairActivity> = candidates
            .into_iter()
            .filter(|pair| users.contains_key(&pair.fids.0) && users.contains_key(&pair.fids.1))
            .take(limit)
            .collect();

        let mut ranked = self.recount(&candidates).await;
        sort_by_activity(&mut ranked);

        ranked
            .into_iter()
            .filter_map(|pair| {
                let first = users.get(&pair.fids.0)?.clone();
                let second = users.get(&pair.fids.1)?.clone();
                Some(TrendingPair {
                    users: [first, second],
                    subcast_count: pair.subcast_count,
                    last_activity: pair.last_activity,
                    is_reciprocal: pair.is_reciprocal,
                })
            })
            .collect()
    }

    /// Rebuild each pair's activity from its members' cast histories. Each
    /// author is fetched once; pairs touching a failed fetch or with an
    /// empty conversation are dropped.
    async fn recount(&self, candidates: &[PairActivity]) -> Vec<PairActivity> {
        let mut authors: Vec<Fid> = candidates
            .iter()
            .flat_map(|pair| [pair.fids.0, pair.fids.1])
            .collect();
        authors.sort_unstable();
        authors.dedup();

        let fetches = authors.iter().map(|&fid| async move {
            (fid, self.provider.casts_by_author(fid).await)
        });
        let histories: HashMap<Fid, Vec<Cast>> = join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(fid, result)| match result {
                Ok(casts) => Some((fid, casts)),
                Err(e) => {
                    warn!(fid, error = %e, "Cast history fetch failed");
                    None
                }
            })
            .collect();

        candidates
            .iter()
            .filter_map(|candidate| {
                let (a, b) = candidate.fids;
                let from_a = histories.get(&a)?;
                let from_b = histories.get(&b)?;
                let conversation =
                    build_conversation(a, b, from_a.iter().chain(from_b).cloned());
                PairActivity::from_conversation(a, b, &conversation)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::REDACTED_TEXT;
    use crate::services::in_memory::InMemoryGraph;
    use crate::services::provider::{ProviderError, SocialGraphProvider};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    fn user(fid: Fid, username: &str) -> User {
        User {
            fid,
            username: username.to_string(),
            display_name: username.to_uppercase(),
            profile_image_url: String::new(),
        }
    }

    fn cast(hash: &str, author: Fid, mentions: &[Fid], minutes: i64, deleted: bool) -> Cast {
        Cast {
            hash: hash.to_string(),
            parent_hash: None,
            author_fid: author,
            mentioned_fids: mentions.to_vec(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
            text: format!("text of {hash}"),
            deleted,
        }
    }

    fn graph() -> Arc<InMemoryGraph> {
        Arc::new(
            InMemoryGraph::new()
                .with_user(user(1, "alice"))
                .with_user(user(2, "bob"))
                .with_user(user(3, "carol"))
                .with_user(user(4, "dave"))
                .with_cast(cast("0x123", 1, &[2], 60, false))
                .with_cast(cast("0x456", 2, &[1], 0, true))
                .with_cast(cast("0x789", 3, &[4], 30, false))
                .with_cast(cast("0xaaa", 3, &[1], 10, false)),
        )
    }

    fn gateway(graph: Arc<InMemoryGraph>) -> ConversationDataGateway {
        ConversationDataGateway::new(graph, &FeedConfig::default())
    }

    #[tokio::test]
    async fn test_resolve_user_by_handle_strips_prefix() {
        let gw = gateway(graph());
        let plain = gw.resolve_user_by_handle("bob").await;
        let prefixed = gw.resolve_user_by_handle("@bob").await;
        assert_eq!(plain, prefixed);
        assert_eq!(plain.unwrap().fid, 2);

        assert!(gw.resolve_user_by_handle("@nobody").await.is_none());
        assert!(gw.resolve_user_by_handle("not a handle").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_user_by_id() {
        let gw = gateway(graph());
        assert_eq!(gw.resolve_user_by_id(3).await.unwrap().username, "carol");
        assert!(gw.resolve_user_by_id(42).await.is_none());
        assert!(gw.resolve_users_by_ids(&[]).await.is_empty());
        assert_eq!(gw.resolve_users_by_ids(&[1, 1, 2]).await.len(), 2);
    }

    #[tokio::test]
    async fn test_get_conversation_example() {
        let gw = gateway(graph());
        let convo = gw.get_conversation(1, 2).await;

        assert_eq!(convo.len(), 2);
        assert!(convo.iter().all(|s| s.is_reciprocal));
        let deleted = convo.iter().find(|s| s.cast_hash == "0x456").unwrap();
        assert!(deleted.deleted);
        assert_eq!(deleted.text, REDACTED_TEXT);

        // Argument order does not matter.
        assert_eq!(gw.get_conversation(2, 1).await, convo);
    }

    #[tokio::test]
    async fn test_get_trending_pairs() {
        let gw = gateway(graph());
        let pairs = gw.get_trending_pairs(None).await;

        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].subcast_count, 2);
        assert_eq!(pairs[0].users[0].fid, 1);
        assert_eq!(pairs[0].users[1].fid, 2);
        assert!(pairs[0].is_reciprocal);
        // Equal counts fall back to recency: (3,4) at +30 beats (1,3) at +10.
        assert_eq!(pairs[1].users[0].fid, 3);
        assert_eq!(pairs[1].users[1].fid, 4);
        assert!(pairs.iter().all(|p| p.subcast_count > 0));
        assert!(pairs.iter().all(|p| p.users[0].fid != p.users[1].fid));

        let convo = gw.get_conversation(1, 2).await;
        assert_eq!(pairs[0].subcast_count, convo.len() as u64);

        assert_eq!(gw.get_trending_pairs(Some(1)).await.len(), 1);
        assert!(gw.get_trending_pairs(Some(0)).await.is_empty());
    }

    #[tokio::test]
    async fn test_trending_drops_unresolvable_users() {
        let graph = Arc::new(
            InMemoryGraph::new()
                .with_user(user(1, "alice"))
                .with_cast(cast("0x1", 1, &[77], 0, false)),
        );
        assert!(gateway(graph).get_trending_pairs(None).await.is_empty());
    }

    /// Serves only the newest cast from its trending window while per-author
    /// history stays complete.
    struct WindowedProvider {
        inner: Arc<InMemoryGraph>,
    }

    #[async_trait]
    impl SocialGraphProvider for WindowedProvider {
        async fn user_by_username(&self, username: &str) -> Result<Option<User>, ProviderError> {
            self.inner.user_by_username(username).await
        }

        async fn users_by_fids(&self, fids: &[Fid]) -> Result<Vec<User>, ProviderError> {
            self.inner.users_by_fids(fids).await
        }

        async fn casts_by_author(&self, fid: Fid) -> Result<Vec<Cast>, ProviderError> {
            self.inner.casts_by_author(fid).await
        }

        async fn recent_casts(&self) -> Result<Vec<Cast>, ProviderError> {
            let mut casts = self.inner.recent_casts().await?;
            casts.truncate(1);
            Ok(casts)
        }
    }

    #[tokio::test]
    async fn test_trending_counts_match_conversation() {
        let provider = Arc::new(WindowedProvider { inner: graph() });
        let gw = ConversationDataGateway::new(provider, &FeedConfig::default());

        let pairs = gw.get_trending_pairs(None).await;
        assert_eq!(pairs.len(), 1);
        let pair = &pairs[0];
        assert_eq!([pair.users[0].fid, pair.users[1].fid], [1, 2]);

        let convo = gw.get_conversation(1, 2).await;
        assert_eq!(convo.len(), 2);
        assert_eq!(pair.subcast_count, convo.len() as u64);
        assert!(pair.is_reciprocal);
        assert_eq!(
            Some(pair.last_activity),
            convo.iter().map(|s| s.timestamp).max()
        );
    }

    #[tokio::test]
    async fn test_trending_fills_limit_past_unresolvable_pairs() {
        let graph = Arc::new(
            InMemoryGraph::new()
                .with_user(user(1, "alice"))
                .with_user(user(2, "bob"))
                .with_user(user(3, "carol"))
                .with_cast(cast("0x1", 1, &[77], 50, false))
                .with_cast(cast("0x2", 1, &[77], 40, false))
                .with_cast(cast("0x3", 1, &[2], 20, false))
                .with_cast(cast("0x4", 2, &[3], 10, false)),
        );

        let pairs = gateway(graph).get_trending_pairs(Some(2)).await;
        let fids: Vec<_> = pairs.iter().map(|p| [p.users[0].fid, p.users[1].fid]).collect();
        assert_eq!(fids, [[1, 2], [2, 3]]);
    }

    #[tokio::test]
    async fn test_attach_users() {
        let gw = gateway(graph());
        let mut convo = gw.get_conversation(1, 3).await;
        assert!(convo.iter().all(|s| s.author.is_none() && s.mentioned.is_none()));

        gw.attach_users(&mut convo).await;
        assert_eq!(convo.len(), 1);
        assert_eq!(convo[0].author.as_ref().map(|u| u.username.as_str()), Some("carol"));
        let mentioned = convo[0].mentioned.as_ref().unwrap();
        assert_eq!(mentioned.len(), 1);
        assert_eq!(mentioned[0].username, "alice");
    }

    #[tokio::test]
    async fn test_failures_degrade_to_empty() {
        let graph = graph();
        graph.set_offline(true);
        let gw = gateway(graph);

        assert!(gw.resolve_user_by_handle("alice").await.is_none());
        assert!(gw.resolve_user_by_id(1).await.is_none());
        assert!(gw.get_conversation(1, 2).await.is_empty());
        assert!(gw.get_trending_pairs(None).await.is_empty());
    }
}
