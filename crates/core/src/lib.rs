//! Core logic for subcast-pulse: conversation assembly, trending ranking,
//! paid unlocks and the client-side view state.

pub mod convert;
pub mod feed;
pub mod handle;
pub mod models;
pub mod search;
pub mod services;
pub mod subcasts;
pub mod view;

pub use feed::{FeedController, FeedSnapshot, FeedTicket};
pub use handle::normalize_handle;
pub use models::{Cast, Fid, REDACTED_TEXT, SortOrder, Subcast, TrendingPair, User};
pub use search::{SearchOutcome, UserSearch};
pub use services::*;
pub use view::ViewState;
