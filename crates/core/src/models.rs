//! Read-model records shared by the gateway, the unlock service and the API.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Farcaster account identifier.
pub type Fid = u64;

/// Text shown in place of a deleted cast until it is unlocked.
pub const REDACTED_TEXT: &str = "[DELETED] This cast was removed by the author";

/// A Farcaster account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub fid: Fid,
    pub username: String,
    pub display_name: String,
    pub profile_image_url: String,
}

/// A cast as returned by a provider, before it is projected into a subcast.
///
/// Providers hand over the raw text of deleted casts when they have it; the
/// gateway is responsible for redacting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cast {
    pub hash: String,
    pub parent_hash: Option<String>,
    pub author_fid: Fid,
    pub mentioned_fids: Vec<Fid>,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub deleted: bool,
}

impl Cast {
    /// Whether this cast mentions `fid`.
    #[must_use]
    pub fn mentions(&self, fid: Fid) -> bool {
        self.mentioned_fids.contains(&fid)
    }
}

/// A cast by one user that mentions another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcast {
    pub cast_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_cast_hash: Option<String>,
    pub fid: Fid,
    pub mentioned_fids: Vec<Fid>,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub deleted: bool,
    pub is_reciprocal: bool,
    /// Resolved author, when the caller asked for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    /// Resolved mentioned users, when the caller asked for them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentioned: Option<Vec<User>>,
}

impl Subcast {
    /// Project a provider cast into a subcast, redacting deleted text.
    ///
    /// `is_reciprocal` starts out false; it is a property of the whole
    /// conversation and is filled in once the result set is known.
    #[must_use]
    pub fn from_cast(cast: Cast) -> Self {
        let text = if cast.deleted {
            REDACTED_TEXT.to_string()
        } else {
            cast.text
        };

        Self {
            cast_hash: cast.hash,
            parent_cast_hash: cast.parent_hash,
            fid: cast.author_fid,
            mentioned_fids: cast.mentioned_fids,
            timestamp: cast.timestamp,
            text,
            deleted: cast.deleted,
            is_reciprocal: false,
            author: None,
            mentioned: None,
        }
    }
}

/// Two users ranked by how much they have been mentioning each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingPair {
    pub users: [User; 2],
    pub subcast_count: u64,
    pub last_activity: DateTime<Utc>,
    pub is_reciprocal: bool,
}

/// Display order of a conversation feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl SortOrder {
    /// The other order.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Newest => Self::Oldest,
            Self::Oldest => Self::Newest,
        }
    }

    /// Sort subcasts by timestamp in this order. Equal timestamps keep their
    /// relative position.
    pub fn sort(self, subcasts: &mut [Subcast]) {
        match self {
            Self::Newest => subcasts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
            Self::Oldest => subcasts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        }
    }
}
