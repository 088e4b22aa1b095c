//! In-memory social graph.
//!
//! Stands in for the upstream API in tests and in demo mode. It also serves
//! as the archive of deleted cast text, since it holds the original casts.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::models::{Cast, Fid, User};
use crate::services::provider::{ProviderError, SocialGraphProvider};
use crate::services::unlock::{ArchiveError, DeletedCastArchive};

/// A fixed set of users and casts held in memory.
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    users: Vec<User>,
    casts: Vec<Cast>,
    offline: AtomicBool,
}

impl InMemoryGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user.
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    /// Add a cast.
    #[must_use]
    pub fn with_cast(mut self, cast: Cast) -> Self {
        self.casts.push(cast);
        self
    }

    /// Make every provider call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), ProviderError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ProviderError::Unavailable("in-memory graph is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn newest_first(mut casts: Vec<Cast>) -> Vec<Cast> {
        casts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        casts
    }

    /// Graph seeded with a small sample conversation, used when no upstream
    /// API key is configured.
    #[must_use]
    pub fn demo() -> Self {
        let now = Utc::now();
        let user = |fid: Fid, username: &str, display_name: &str| User {
            fid,
            username: username.to_string(),
            display_name: display_name.to_string(),
            profile_image_url: format!("https://api.dicebear.com/7.x/identicon/png?seed={username}"),
        };
        let cast = |hash: &str, author: Fid, mentions: &[Fid], minutes_ago: i64, text: &str| Cast {
            hash: hash.to_string(),
            parent_hash: None,
            author_fid: author,
            mentioned_fids: mentions.to_vec(),
            timestamp: now - Duration::minutes(minutes_ago),
            text: text.to_string(),
            deleted: false,
        };

        let mut deleted = cast(
            "0x456",
            2,
            &[1],
            60,
            "Honestly I think the fee market change ships too early.",
        );
        deleted.deleted = true;
        deleted.parent_hash = Some("0x123".to_string());

        Self::new()
            .with_user(user(1, "vitalik", "Vitalik Buterin"))
            .with_user(user(2, "dwr", "Dan Romero"))
            .with_user(user(3, "v", "Varun Srinivasan"))
            .with_user(user(4, "jessepollak", "Jesse Pollak"))
            .with_cast(cast(
                "0x123",
                1,
                &[2],
                0,
                "Great point! What do you think about the new protocol update?",
            ))
            .with_cast(deleted)
            .with_cast(cast("0x789", 1, &[2, 3], 120, "Looping in @v on storage rent."))
            .with_cast(cast("0xabc", 3, &[1], 180, "Storage rent numbers are up."))
            .with_cast(cast("0xdef", 4, &[2], 240, "Frames on Base are live."))
    }
}

#[async_trait]
impl SocialGraphProvider for InMemoryGraph {
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, ProviderError> {
        self.check_online()?;
        Ok(self
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn users_by_fids(&self, fids: &[Fid]) -> Result<Vec<User>, ProviderError> {
        self.check_online()?;
        Ok(self
            .users
            .iter()
            .filter(|u| fids.contains(&u.fid))
            .cloned()
            .collect())
    }

    async fn casts_by_author(&self, fid: Fid) -> Result<Vec<Cast>, ProviderError> {
        self.check_online()?;
        Ok(Self::newest_first(
            self.casts
                .iter()
                .filter(|c| c.author_fid == fid)
                .cloned()
                .collect(),
        ))
    }

    async fn recent_casts(&self) -> Result<Vec<Cast>, ProviderError> {
        self.check_online()?;
        Ok(Self::newest_first(self.casts.clone()))
    }
}

#[async_trait]
impl DeletedCastArchive for InMemoryGraph {
    async fn original_text(&self, cast_hash: &str) -> Result<Option<String>, ArchiveError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ArchiveError::Unavailable("in-memory graph is offline".to_string()));
        }

        Ok(self
            .casts
            .iter()
            .find(|c| c.deleted && c.hash == cast_hash)
            .map(|c| c.text.clone()))
    }
}
