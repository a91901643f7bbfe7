//! Repository interfaces the services are built against.
//!
//! Every service receives its store at construction, so tests run against
//! [`MemoryStore`](crate::services::memory::MemoryStore) while the server
//! runs against [`DatabaseService`](crate::services::database::DatabaseService).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{content::ContentItem, payment::Payment, subscription::Subscription};

/// A subscription together with the payment that bought it.
///
/// The two rows only ever reach storage together.
#[derive(Debug, Clone)]
pub struct Purchase {
    pub subscription: Subscription,
    pub payment: Payment,
}

#[async_trait::async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Writes both rows of `purchase` in a single atomic unit.
    ///
    /// Inside that unit, active rows of the same pair whose window ended at or
    /// before the purchase start are flipped to expired, releasing their slot.
    /// Fails with [`StoreError::SlotTaken`] if a live active row still holds
    /// the pair; on any failure nothing is written.
    async fn commit_purchase(&self, purchase: &Purchase) -> Result<(), StoreError>;

    /// The row that is live-active for the pair at `now`, if any.
    async fn find_active(
        &self,
        subscriber_id: Uuid,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Flips the pair's live-active rows to canceled and returns how many.
    async fn cancel_active(
        &self,
        subscriber_id: Uuid,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    async fn active_creator_ids(
        &self,
        subscriber_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, StoreError>;

    /// Rows with stored status active whose end date is still ahead of `now`,
    /// newest first.
    async fn current_subscriptions(
        &self,
        subscriber_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, StoreError>;

    async fn count_active_for_creator(
        &self,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Every row ever written for the creator, whatever its status.
    async fn subscriptions_for_creator(&self, creator_id: Uuid) -> Result<Vec<Subscription>, StoreError>;

    async fn get_subscription(&self, subscription_id: Uuid) -> Result<Option<Subscription>, StoreError>;
}

#[async_trait::async_trait]
pub trait PaymentStore: Send + Sync {
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, StoreError>;

    async fn payment_for_subscription(&self, subscription_id: Uuid) -> Result<Option<Payment>, StoreError>;

    async fn payments_for_subscriptions(&self, subscription_ids: &[Uuid]) -> Result<Vec<Payment>, StoreError>;
}

/// Lookup of creator media. Uploading is handled elsewhere.
#[async_trait::async_trait]
pub trait ContentCatalog: Send + Sync {
    async fn find_content(&self, content_id: Uuid) -> Result<Option<ContentItem>, StoreError>;

    async fn insert_content(&self, item: &ContentItem) -> Result<(), StoreError>;
}

/// Everything the ledger needs from storage.
pub trait LedgerStore: SubscriptionStore + PaymentStore {}

impl<T: SubscriptionStore + PaymentStore + ?Sized> LedgerStore for T {}
