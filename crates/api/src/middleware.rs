//! Shared handler state.

use subcast_core::{ConversationDataGateway, UnlockService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Read access to users, conversations and trending pairs.
    pub gateway: ConversationDataGateway,
    /// Paid unlock of deleted subcasts.
    pub unlock_service: UnlockService,
}

impl AppState {
    /// Create the application state.
    #[must_use]
    pub const fn new(gateway: ConversationDataGateway, unlock_service: UnlockService) -> Self {
        Self {
            gateway,
            unlock_service,
        }
    }
}
