//! Debounced user search.
//!
//! A query is only sent upstream once input has been quiet for the configured
//! interval. Each keystroke supersedes the previous query, and a result that
//! lands after being superseded is reported as such instead of being shown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use subcast_common::FeedConfig;
use tracing::debug;

use crate::models::User;
use crate::services::gateway::ConversationDataGateway;

/// Result of one search call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "users", rename_all = "camelCase")]
pub enum SearchOutcome {
    /// A newer query arrived before this one finished.
    Superseded,
    /// Matching users for the latest query.
    Results(Vec<User>),
}

impl SearchOutcome {
    /// The users found, or `None` when superseded.
    #[must_use]
    pub fn into_users(self) -> Option<Vec<User>> {
        match self {
            Self::Superseded => None,
            Self::Results(users) => Some(users),
        }
    }
}

/// Debounced search box state.
pub struct UserSearch {
    gateway: ConversationDataGateway,
    quiet: Duration,
    latest: AtomicU64,
}

impl UserSearch {
    /// Create a search with an explicit quiet interval.
    #[must_use]
    pub const fn new(gateway: ConversationDataGateway, quiet: Duration) -> Self {
        Self {
            gateway,
            quiet,
            latest: AtomicU64::new(0),
        }
    }

    /// Create a search using the configured debounce.
    #[must_use]
    pub const fn from_config(gateway: ConversationDataGateway, config: &FeedConfig) -> Self {
        Self::new(gateway, Duration::from_millis(config.search_debounce_ms))
    }

    /// Submit the current contents of the search box.
    ///
    /// An empty query clears results immediately and cancels any pending
    /// query.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        if query.trim().is_empty() {
            return SearchOutcome::Results(Vec::new());
        }

        tokio::time::sleep(self.quiet).await;
        if !self.is_current(ticket) {
            debug!(query = %query, "Search superseded before dispatch");
            return SearchOutcome::Superseded;
        }

        let found = self.gateway.resolve_user_by_handle(query).await;
        if !self.is_current(ticket) {
            debug!(query = %query, "Search superseded in flight");
            return SearchOutcome::Superseded;
        }

        SearchOutcome::Results(found.into_iter().collect())
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}
