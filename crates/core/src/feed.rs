//! Conversation feed state with a stale-response guard.
//!
//! Every load takes a ticket stamped with the current generation. Switching
//! to another pair (or leaving the feed) bumps the generation, so a response
//! that arrives for the previous pair is dropped instead of overwriting the
//! feed now on screen.

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{Fid, SortOrder, Subcast, User};
use crate::services::gateway::ConversationDataGateway;
use crate::services::unlock::UnlockReceipt;

/// Handle for one in-flight feed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedTicket {
    generation: u64,
    fids: [Fid; 2],
}

impl FeedTicket {
    /// The pair this ticket was issued for.
    #[must_use]
    pub const fn fids(&self) -> [Fid; 2] {
        self.fids
    }
}

/// What the feed view currently shows.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    /// The pair on display.
    pub users: Option<[User; 2]>,
    /// Loaded subcasts, in provider order.
    pub subcasts: Vec<Subcast>,
    /// Whether a load for the current pair is outstanding.
    pub loading: bool,
    /// Display order.
    pub sort: SortOrder,
}

#[derive(Default)]
struct FeedState {
    generation: u64,
    snapshot: FeedSnapshot,
}

/// Feed of the currently selected pair.
#[derive(Default)]
pub struct FeedController {
    state: RwLock<FeedState>,
}

impl FeedController {
    /// Create an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start showing `users`. Any earlier in-flight load becomes stale.
    pub async fn begin(&self, users: [User; 2]) -> FeedTicket {
        let mut state = self.state.write().await;
        state.generation += 1;

        let ticket = FeedTicket {
            generation: state.generation,
            fids: [users[0].fid, users[1].fid],
        };

        state.snapshot.users = Some(users);
        state.snapshot.subcasts.clear();
        state.snapshot.loading = true;
        ticket
    }

    /// Apply a load result. Returns false when the ticket is stale and the
    /// result was discarded.
    pub async fn complete(&self, ticket: FeedTicket, subcasts: Vec<Subcast>) -> bool {
        let mut state = self.state.write().await;
        if state.generation != ticket.generation {
            debug!(
                fids = ?ticket.fids,
                ticket = ticket.generation,
                current = state.generation,
                "Discarding stale feed response"
            );
            return false;
        }

        state.snapshot.subcasts = subcasts;
        state.snapshot.loading = false;
        true
    }

    /// Load the conversation of `users` through `gateway`.
    pub async fn load(&self, gateway: &ConversationDataGateway, users: [User; 2]) -> bool {
        let ticket = self.begin(users).await;
        let [a, b] = ticket.fids();
        let subcasts = gateway.get_conversation(a, b).await;
        self.complete(ticket, subcasts).await
    }

    /// Leave the feed. Outstanding loads become stale.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        let sort = state.snapshot.sort;
        state.snapshot = FeedSnapshot {
            sort,
            ..FeedSnapshot::default()
        };
    }

    /// Flip between newest-first and oldest-first.
    pub async fn toggle_sort(&self) -> SortOrder {
        let mut state = self.state.write().await;
        state.snapshot.sort = state.snapshot.sort.toggled();
        state.snapshot.sort
    }

    /// Subcasts in the current display order.
    pub async fn sorted(&self) -> Vec<Subcast> {
        let state = self.state.read().await;
        let mut subcasts = state.snapshot.subcasts.clone();
        state.snapshot.sort.sort(&mut subcasts);
        subcasts
    }

    /// Reveal an unlocked subcast in the loaded feed.
    pub async fn apply_unlock(&self, receipt: &UnlockReceipt) -> bool {
        let mut state = self.state.write().await;
        state
            .snapshot
            .subcasts
            .iter_mut()
            .any(|subcast| receipt.apply(subcast))
    }

    /// Current feed contents.
    pub async fn snapshot(&self) -> FeedSnapshot {
        self.state.read().await.snapshot.clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{Cast, REDACTED_TEXT};
    use crate::services::in_memory::InMemoryGraph;
    use crate::services::provider::{ProviderError, SocialGraphProvider};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;
    use subcast_common::FeedConfig;
    use tokio::sync::Notify;

    fn user(fid: Fid) -> User {
        User {
            fid,
            username: format!("user{fid}"),
            display_name: format!("User {fid}"),
            profile_image_url: String::new(),
        }
    }

    fn cast(hash: &str, author: Fid, mention: Fid, minutes: i64) -> Cast {
        Cast {
            hash: hash.to_string(),
            parent_hash: None,
            author_fid: author,
            mentioned_fids: vec![mention],
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
            text: format!("text {hash}"),
            deleted: false,
        }
    }

    fn graph() -> InMemoryGraph {
        let mut deleted = cast("0x456", 2, 1, 5);
        deleted.deleted = true;
        InMemoryGraph::new()
            .with_user(user(1))
            .with_user(user(2))
            .with_user(user(3))
            .with_user(user(4))
            .with_cast(cast("0x123", 1, 2, 10))
            .with_cast(deleted)
            .with_cast(cast("0x999", 3, 4, 0))
    }

    /// Holds back casts authored by fid 1 until released.
    struct GatedProvider {
        inner: InMemoryGraph,
        release: Notify,
    }

    #[async_trait]
    impl SocialGraphProvider for GatedProvider {
        async fn user_by_username(&self, username: &str) -> Result<Option<User>, ProviderError> {
            self.inner.user_by_username(username).await
        }

        async fn users_by_fids(&self, fids: &[Fid]) -> Result<Vec<User>, ProviderError> {
            self.inner.users_by_fids(fids).await
        }

        async fn casts_by_author(&self, fid: Fid) -> Result<Vec<Cast>, ProviderError> {
            if fid == 1 {
                self.release.notified().await;
            }
            self.inner.casts_by_author(fid).await
        }

        async fn recent_casts(&self) -> Result<Vec<Cast>, ProviderError> {
            self.inner.recent_casts().await
        }
    }

    #[tokio::test]
    async fn test_stale_ticket_is_discarded() {
        let feed = FeedController::new();
        let old = feed.begin([user(1), user(2)]).await;
        let new = feed.begin([user(3), user(4)]).await;

        assert!(feed.complete(new, vec![]).await);
        assert!(!feed.complete(old, vec![]).await);

        let snapshot = feed.snapshot().await;
        assert_eq!(snapshot.users.map(|u| u[0].fid), Some(3));
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_superseded_load_does_not_overwrite_feed() {
        let provider = Arc::new(GatedProvider {
            inner: graph(),
            release: Notify::new(),
        });
        let gateway = ConversationDataGateway::new(provider.clone(), &FeedConfig::default());
        let feed = Arc::new(FeedController::new());

        let first = tokio::spawn({
            let feed = feed.clone();
            let gateway = gateway.clone();
            async move { feed.load(&gateway, [user(1), user(2)]).await }
        });

        // Wait until the first load has taken its ticket.
        while feed.snapshot().await.users.map(|u| u[0].fid) != Some(1) {
            tokio::task::yield_now().await;
        }

        assert!(feed.load(&gateway, [user(3), user(4)]).await);
        provider.release.notify_one();
        assert!(!first.await.unwrap());

        let snapshot = feed.snapshot().await;
        let users = snapshot.users.unwrap();
        assert_eq!([users[0].fid, users[1].fid], [3, 4]);
        assert_eq!(snapshot.subcasts.len(), 1);
        assert_eq!(snapshot.subcasts[0].cast_hash, "0x999");
    }

    #[tokio::test]
    async fn test_clear_discards_in_flight_load() {
        let feed = FeedController::new();
        let ticket = feed.begin([user(1), user(2)]).await;
        feed.clear().await;

        assert!(!feed.complete(ticket, vec![]).await);
        assert!(feed.snapshot().await.users.is_none());
    }

    #[tokio::test]
    async fn test_sort_toggle_and_unlock() {
        let graph = Arc::new(graph());
        let gateway = ConversationDataGateway::new(graph, &FeedConfig::default());
        let feed = FeedController::new();

        assert!(feed.load(&gateway, [user(1), user(2)]).await);
        let newest: Vec<_> = feed.sorted().await.into_iter().map(|s| s.cast_hash).collect();
        assert_eq!(newest, ["0x123", "0x456"]);

        assert_eq!(feed.toggle_sort().await, SortOrder::Oldest);
        let oldest: Vec<_> = feed.sorted().await.into_iter().map(|s| s.cast_hash).collect();
        assert_eq!(oldest, ["0x456", "0x123"]);

        let receipt = UnlockReceipt {
            cast_hash: "0x456".to_string(),
            text: "the original".to_string(),
            fee: crate::services::unlock::UnlockFee::default(),
            charge_id: "sim_1".to_string(),
            unlocked_at: Utc::now(),
            already_unlocked: false,
        };
        let before = feed.snapshot().await;
        assert_eq!(before.subcasts[1].text, REDACTED_TEXT);

        assert!(feed.apply_unlock(&receipt).await);
        let after = feed.snapshot().await;
        let unlocked = after.subcasts.iter().find(|s| s.cast_hash == "0x456").unwrap();
        assert!(!unlocked.deleted);
        assert_eq!(unlocked.text, "the original");
    }
}
