//! Navigation state of a client session.
//!
//! Three views: trending (home), user search, and the feed of one pair.
//! Transitions are pure; they consume the current state and return the next.

use serde::{Deserialize, Serialize};

use crate::models::{TrendingPair, User};

/// Current view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum ViewState {
    /// Trending pairs.
    #[default]
    Home,
    /// User search.
    Search,
    /// Conversation feed between two users.
    Feed {
        /// The pair being displayed.
        users: [User; 2],
        /// The user picked from search, when the feed was opened that way.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        searched: Option<User>,
    },
}

impl ViewState {
    /// Switch to the search view.
    #[must_use]
    pub fn open_search(self) -> Self {
        Self::Search
    }

    /// Return to the trending view, dropping any selection.
    #[must_use]
    pub fn go_home(self) -> Self {
        Self::Home
    }

    /// Open the feed of a trending pair.
    #[must_use]
    pub fn select_pair(self, pair: TrendingPair) -> Self {
        Self::Feed {
            users: pair.users,
            searched: None,
        }
    }

    /// Open the feed between a searched user and a counterpart.
    ///
    /// Selecting a user as their own counterpart leaves the state unchanged.
    #[must_use]
    pub fn select_user(self, user: User, counterpart: User) -> Self {
        if user.fid == counterpart.fid {
            return self;
        }
        Self::Feed {
            users: [user.clone(), counterpart],
            searched: Some(user),
        }
    }

    /// Leave the current view.
    #[must_use]
    pub fn back(self) -> Self {
        Self::Home
    }

    /// Handle the primary action button.
    #[must_use]
    pub fn press_primary(self) -> Self {
        match self {
            Self::Home => Self::Search,
            _ => Self::Home,
        }
    }

    /// Label of the primary action button.
    #[must_use]
    pub const fn primary_label(&self) -> &'static str {
        match self {
            Self::Home => "SEARCH USERS",
            _ => "HOME",
        }
    }

    /// The pair on display, when in the feed view.
    #[must_use]
    pub const fn pair(&self) -> Option<&[User; 2]> {
        match self {
            Self::Feed { users, .. } => Some(users),
            _ => None,
        }
    }
}
