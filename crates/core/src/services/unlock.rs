//! Paid disclosure of deleted cast text.
//!
//! A caller pays a fixed, pre-disclosed fee to see the original text of a
//! deleted subcast. Each `(session, cast hash)` is charged at most once:
//! concurrent and repeated unlocks share one attempt. A charge the processor
//! could not confirm stays pending and is never retried within the session.
//! Any other failure leaves nothing behind, so the caller keeps showing the
//! redacted record and the ledger only holds live entries.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use subcast_common::{AppError, UnlockConfig};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::models::Subcast;

/// Fee charged for one unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockFee {
    /// Amount in the currency's minor unit.
    pub amount_cents: u32,
    /// ISO currency code.
    pub currency: String,
}

impl UnlockFee {
    /// Build the fee from configuration.
    #[must_use]
    pub fn from_config(config: &UnlockConfig) -> Self {
        Self {
            amount_cents: config.fee_cents,
            currency: config.currency.clone(),
        }
    }
}

impl Default for UnlockFee {
    fn default() -> Self {
        Self::from_config(&UnlockConfig::default())
    }
}

/// Proof of a successful unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockReceipt {
    /// The unlocked cast.
    pub cast_hash: String,
    /// Original text of the cast.
    pub text: String,
    /// Fee that was charged.
    pub fee: UnlockFee,
    /// Processor reference for the charge.
    pub charge_id: String,
    /// When the charge was confirmed.
    pub unlocked_at: DateTime<Utc>,
    /// True when served from an earlier unlock in the same session.
    #[serde(default)]
    pub already_unlocked: bool,
}

impl UnlockReceipt {
    /// Reveal the original text on a local record.
    ///
    /// Returns false and leaves the record untouched when the hashes differ.
    pub fn apply(&self, subcast: &mut Subcast) -> bool {
        if subcast.cast_hash != self.cast_hash {
            return false;
        }
        subcast.text = self.text.clone();
        subcast.deleted = false;
        true
    }
}

/// Error type for payment processors.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The processor refused the charge.
    #[error("charge declined: {0}")]
    Declined(String),
    /// The processor could not confirm whether the charge went through.
    #[error("charge could not be confirmed: {0}")]
    Unconfirmed(String),
}

/// Something that can take a micro-payment.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Charge `fee` for unlocking `cast_hash` on behalf of `session_id`.
    ///
    /// Returns a processor charge id once the charge is confirmed.
    async fn charge(
        &self,
        session_id: &str,
        cast_hash: &str,
        fee: &UnlockFee,
    ) -> Result<String, PaymentError>;
}

/// Error type for deleted-cast archives.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The archive could not be read.
    #[error("archive unavailable: {0}")]
    Unavailable(String),
}

/// Source of the original text of deleted casts.
#[async_trait]
pub trait DeletedCastArchive: Send + Sync {
    /// Original text of `cast_hash`, or `None` when the hash is not a
    /// deleted cast known to the archive.
    async fn original_text(&self, cast_hash: &str) -> Result<Option<String>, ArchiveError>;
}

/// Error type for unlock operations.
#[derive(Debug, thiserror::Error)]
pub enum UnlockError {
    /// The hash does not refer to an archived deleted cast.
    #[error("cast {0} is not a deleted cast")]
    NotDeleted(String),
    /// The charge was refused.
    #[error("payment declined: {0}")]
    ChargeDeclined(String),
    /// The charge could not be confirmed.
    #[error("payment not confirmed: {0}")]
    ChargeUnconfirmed(String),
    /// An earlier charge in this session is still unconfirmed.
    #[error("earlier payment still unconfirmed: {0}")]
    ChargePending(String),
    /// The archive failed.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
}

impl From<PaymentError> for UnlockError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Declined(reason) => Self::ChargeDeclined(reason),
            PaymentError::Unconfirmed(reason) => Self::ChargeUnconfirmed(reason),
        }
    }
}

impl From<UnlockError> for AppError {
    fn from(err: UnlockError) -> Self {
        match err {
            UnlockError::NotDeleted(_) => Self::Conflict(err.to_string()),
            UnlockError::ChargeDeclined(_)
            | UnlockError::ChargeUnconfirmed(_)
            | UnlockError::ChargePending(_) => Self::PaymentRequired(err.to_string()),
            UnlockError::Archive(_) => Self::ExternalService(err.to_string()),
        }
    }
}

/// Payment processor that settles nothing.
///
/// Approves every charge unless configured to decline, and counts the
/// charges it approved.
#[derive(Debug, Default)]
pub struct SimulatedPayments {
    decline_all: bool,
    charges: AtomicU64,
}

impl SimulatedPayments {
    /// Create a processor that approves every charge.
    #[must_use]
    pub fn approving() -> Self {
        Self::default()
    }

    /// Create a processor that declines every charge.
    #[must_use]
    pub fn declining() -> Self {
        Self {
            decline_all: true,
            charges: AtomicU64::new(0),
        }
    }

    /// Number of approved charges so far.
    #[must_use]
    pub fn charge_count(&self) -> u64 {
        self.charges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedPayments {
    async fn charge(
        &self,
        session_id: &str,
        cast_hash: &str,
        fee: &UnlockFee,
    ) -> Result<String, PaymentError> {
        if self.decline_all {
            return Err(PaymentError::Declined(
                "simulated processor declines all charges".to_string(),
            ));
        }

        self.charges.fetch_add(1, Ordering::SeqCst);
        info!(
            session = %session_id,
            cast_hash = %cast_hash,
            amount_cents = fee.amount_cents,
            currency = %fee.currency,
            "Simulated charge approved"
        );
        Ok(format!("sim_{}", uuid::Uuid::new_v4().simple()))
    }
}

/// Archive backed by a JSON object of `{ "<cast hash>": "<text>" }`.
#[derive(Debug, Clone, Default)]
pub struct FileArchive {
    entries: HashMap<String, String>,
}

impl FileArchive {
    /// Load an archive file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| ArchiveError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Parse an archive from JSON bytes.
    pub fn from_json(raw: &[u8]) -> Result<Self, ArchiveError> {
        let entries: HashMap<String, String> = serde_json::from_slice(raw)
            .map_err(|e| ArchiveError::Unavailable(format!("invalid archive: {e}")))?;
        Ok(Self { entries })
    }

    /// Number of archived casts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DeletedCastArchive for FileArchive {
    async fn original_text(&self, cast_hash: &str) -> Result<Option<String>, ArchiveError> {
        Ok(self.entries.get(cast_hash).cloned())
    }
}

type LedgerKey = (String, String);

/// State of one `(session, cast hash)` entry.
#[derive(Debug, Default)]
enum Slot {
    /// No attempt has finished yet.
    #[default]
    Empty,
    /// Charged and revealed.
    Unlocked(UnlockReceipt),
    /// Charged, but the processor could not confirm it.
    Pending(String),
    /// The attempt failed and the entry is being removed.
    Retired,
}

type SlotHandle = Arc<Mutex<Slot>>;

/// Unlock service.
#[derive(Clone)]
pub struct UnlockService {
    payments: Arc<dyn PaymentProcessor>,
    archive: Arc<dyn DeletedCastArchive>,
    fee: UnlockFee,
    // Slot locks are never taken while the ledger lock is held.
    ledger: Arc<Mutex<HashMap<LedgerKey, SlotHandle>>>,
}

impl UnlockService {
    /// Create a new unlock service.
    #[must_use]
    pub fn new(
        payments: Arc<dyn PaymentProcessor>,
        archive: Arc<dyn DeletedCastArchive>,
        fee: UnlockFee,
    ) -> Self {
        Self {
            payments,
            archive,
            fee,
            ledger: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The fee charged per unlock, disclosed before any charge is made.
    #[must_use]
    pub const fn fee(&self) -> &UnlockFee {
        &self.fee
    }

    /// Unlock `cast_hash` for `session_id`.
    ///
    /// Callers racing on the same key wait for the first attempt. After an
    /// unconfirmed charge every later call fails with
    /// [`UnlockError::ChargePending`] without contacting the processor.
    pub async fn unlock(
        &self,
        session_id: &str,
        cast_hash: &str,
    ) -> Result<UnlockReceipt, UnlockError> {
        let key = (session_id.to_string(), cast_hash.to_string());

        loop {
            let handle = {
                let mut ledger = self.ledger.lock().await;
                ledger.entry(key.clone()).or_default().clone()
            };

            let mut slot = handle.lock().await;
            if matches!(*slot, Slot::Retired) {
                drop(slot);
                self.evict(&key, &handle).await;
                continue;
            }

            match &*slot {
                Slot::Unlocked(receipt) => {
                    return Ok(UnlockReceipt {
                        already_unlocked: true,
                        ..receipt.clone()
                    });
                }
                Slot::Pending(reason) => return Err(UnlockError::ChargePending(reason.clone())),
                Slot::Empty | Slot::Retired => {}
            }

            return match self.charge_and_reveal(session_id, cast_hash).await {
                Ok(receipt) => {
                    *slot = Slot::Unlocked(receipt.clone());
                    Ok(receipt)
                }
                Err(UnlockError::ChargeUnconfirmed(reason)) => {
                    *slot = Slot::Pending(reason.clone());
                    Err(UnlockError::ChargeUnconfirmed(reason))
                }
                Err(e) => {
                    *slot = Slot::Retired;
                    drop(slot);
                    self.evict(&key, &handle).await;
                    Err(e)
                }
            };
        }
    }

    /// Drop `key` if it still maps to `handle`.
    async fn evict(&self, key: &LedgerKey, handle: &SlotHandle) {
        let mut ledger = self.ledger.lock().await;
        if ledger
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, handle))
        {
            ledger.remove(key);
        }
    }

    async fn charge_and_reveal(
        &self,
        session_id: &str,
        cast_hash: &str,
    ) -> Result<UnlockReceipt, UnlockError> {
        let Some(text) = self.archive.original_text(cast_hash).await? else {
            return Err(UnlockError::NotDeleted(cast_hash.to_string()));
        };

        let charge_id = self
            .payments
            .charge(session_id, cast_hash, &self.fee)
            .await
            .inspect_err(|e| {
                warn!(session = %session_id, cast_hash = %cast_hash, error = %e, "Unlock charge failed");
            })?;

        info!(session = %session_id, cast_hash = %cast_hash, charge_id = %charge_id, "Deleted cast unlocked");

        Ok(UnlockReceipt {
            cast_hash: cast_hash.to_string(),
            text,
            fee: self.fee.clone(),
            charge_id,
            unlocked_at: Utc::now(),
            already_unlocked: false,
        })
    }

    /// Receipt of an earlier successful unlock in this session, if any.
    pub async fn receipt(&self, session_id: &str, cast_hash: &str) -> Option<UnlockReceipt> {
        let handle = {
            let ledger = self.ledger.lock().await;
            ledger
                .get(&(session_id.to_string(), cast_hash.to_string()))
                .cloned()?
        };

        match &*handle.lock().await {
            Slot::Unlocked(receipt) => Some(receipt.clone()),
            _ => None,
        }
    }

    /// Forget every unlock recorded for `session_id`, pending ones included.
    /// Returns how many entries were dropped.
    pub async fn end_session(&self, session_id: &str) -> usize {
        let mut ledger = self.ledger.lock().await;
        let before = ledger.len();
        ledger.retain(|(session, _), _| session != session_id);
        let dropped = before - ledger.len();
        info!(session = %session_id, dropped, "Unlock session ended");
        dropped
    }

    #[cfg(test)]
    async fn ledger_len(&self) -> usize {
        self.ledger.lock().await.len()
    }
}
