//! Upstream providers, the conversation gateway and the unlock service.

pub mod gateway;
pub mod in_memory;
pub mod neynar;
pub mod provider;
pub mod unlock;

pub use gateway::{ConversationDataGateway, Provider};
pub use in_memory::InMemoryGraph;
pub use neynar::NeynarClient;
pub use provider::{ProviderError, SocialGraphProvider};
pub use unlock::{
    ArchiveError, DeletedCastArchive, FileArchive, PaymentError, PaymentProcessor,
    SimulatedPayments, UnlockError, UnlockFee, UnlockReceipt, UnlockService,
};
