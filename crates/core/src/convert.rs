//! Neynar response shapes and their conversion into local records.
//!
//! Upstream fields are snake_case and frequently optional. Each remote shape
//! is deserialized as-is and then mapped by an explicit function that
//! decides every default, so nothing downstream reads raw JSON.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{Cast, Fid, User};

/// User object as returned by `/user/by_username` and `/user/bulk`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    pub fid: Fid,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pfp_url: Option<String>,
}

/// Author reference embedded in a cast.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCastAuthor {
    pub fid: Fid,
}

/// Cast object as returned by the feed endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCast {
    pub hash: String,
    #[serde(default)]
    pub parent_hash: Option<String>,
    pub author: RemoteCastAuthor,
    #[serde(default)]
    pub text: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub mentioned_profiles: Option<Vec<RemoteUser>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// `{ "user": ... }` envelope.
#[derive(Debug, Deserialize)]
pub struct UserEnvelope {
    pub user: RemoteUser,
}

/// `{ "users": [...] }` envelope.
#[derive(Debug, Deserialize)]
pub struct UsersEnvelope {
    #[serde(default)]
    pub users: Vec<RemoteUser>,
}

/// Pagination marker of feed responses.
#[derive(Debug, Default, Deserialize)]
pub struct NextPage {
    #[serde(default)]
    pub cursor: Option<String>,
}

/// `{ "casts": [...], "next": { "cursor": ... } }` envelope.
#[derive(Debug, Deserialize)]
pub struct CastsEnvelope {
    #[serde(default)]
    pub casts: Vec<RemoteCast>,
    #[serde(default)]
    pub next: Option<NextPage>,
}

impl CastsEnvelope {
    /// Cursor of the following page, if upstream has more.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.next
            .as_ref()
            .and_then(|next| next.cursor.as_deref())
            .filter(|cursor| !cursor.is_empty())
    }
}

/// Map a remote user into a local [`User`].
///
/// A missing display name falls back to the username and a missing avatar
/// to an empty URL.
#[must_use]
pub fn user_from_remote(remote: RemoteUser) -> User {
    let display_name = remote
        .display_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| remote.username.clone());

    User {
        fid: remote.fid,
        username: remote.username,
        display_name,
        profile_image_url: remote.pfp_url.unwrap_or_default(),
    }
}

/// Map a remote cast into a local [`Cast`].
///
/// Mentioned fids keep upstream order with duplicates removed.
#[must_use]
pub fn cast_from_remote(remote: RemoteCast) -> Cast {
    let mut mentioned_fids: Vec<Fid> = Vec::new();
    for profile in remote.mentioned_profiles.unwrap_or_default() {
        if !mentioned_fids.contains(&profile.fid) {
            mentioned_fids.push(profile.fid);
        }
    }

    Cast {
        hash: remote.hash,
        parent_hash: remote.parent_hash,
        author_fid: remote.author.fid,
        mentioned_fids,
        timestamp: remote.timestamp,
        text: remote.text.unwrap_or_default(),
        deleted: remote.deleted_at.is_some(),
    }
}
