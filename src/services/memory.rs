use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::{
    content::ContentItem,
    payment::Payment,
    subscription::{Subscription, SubscriptionStatus},
};
use crate::services::store::{ContentCatalog, PaymentStore, Purchase, SubscriptionStore};

#[derive(Default)]
struct Tables {
    subscriptions: HashMap<Uuid, Subscription>,
    // slot -> subscription id; mirrors the unique index of the database
    slots: HashMap<String, Uuid>,
    payments: HashMap<Uuid, Payment>,
    contents: HashMap<Uuid, ContentItem>,
}

impl Tables {
    fn pair_rows(&self, subscriber_id: Uuid, creator_id: Uuid) -> impl Iterator<Item = &Subscription> {
        self.subscriptions
            .values()
            .filter(move |s| s.subscriber_id == subscriber_id && s.creator_id == creator_id)
    }

    fn close(&mut self, subscription_id: Uuid, transition: fn(&mut Subscription)) {
        if let Some(subscription) = self.subscriptions.get_mut(&subscription_id) {
            let held = subscription.slot();
            transition(subscription);
            if self.slots.get(&held) == Some(&subscription_id) {
                self.slots.remove(&held);
            }
            self.slots.insert(subscription.slot(), subscription_id);
        }
    }
}

/// In-process store. All writes happen under one lock, which gives the same
/// all-or-nothing behavior as a database transaction.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for MemoryStore {
    async fn commit_purchase(&self, purchase: &Purchase) -> Result<(), StoreError> {
        let Purchase { subscription, payment } = purchase;
        let mut tables = self.tables.write().await;

        if tables.subscriptions.contains_key(&subscription.id) {
            return Err(StoreError::Duplicate(format!("subscriptions:{}", subscription.id)));
        }
        if tables.payments.contains_key(&payment.id) {
            return Err(StoreError::Duplicate(format!("payments:{}", payment.id)));
        }

        let stale: Vec<Uuid> = tables
            .pair_rows(subscription.subscriber_id, subscription.creator_id)
            .filter(|s| s.is_elapsed_at(subscription.start_date))
            .map(|s| s.id)
            .collect();

        let slot = subscription.slot();
        if let Some(holder) = tables.slots.get(&slot) {
            if !stale.contains(holder) {
                return Err(StoreError::SlotTaken(slot));
            }
        }

        // Every check passed; nothing below can fail.
        for id in stale {
            tables.close(id, Subscription::expire);
        }
        tables.slots.insert(slot, subscription.id);
        tables.subscriptions.insert(subscription.id, subscription.clone());
        tables.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_active(
        &self,
        subscriber_id: Uuid,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscription>, StoreError> {
        let tables = self.tables.read().await;
        let found = tables
            .pair_rows(subscriber_id, creator_id)
            .find(|s| s.is_active_at(now))
            .cloned();
        Ok(found)
    }

    async fn cancel_active(
        &self,
        subscriber_id: Uuid,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let live: Vec<Uuid> = tables
            .pair_rows(subscriber_id, creator_id)
            .filter(|s| s.is_active_at(now))
            .map(|s| s.id)
            .collect();

        for id in &live {
            tables.close(*id, Subscription::cancel);
        }
        Ok(live.len() as u64)
    }

    async fn active_creator_ids(
        &self,
        subscriber_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, StoreError> {
        let tables = self.tables.read().await;
        let mut ids: Vec<Uuid> = tables
            .subscriptions
            .values()
            .filter(|s| s.subscriber_id == subscriber_id && s.is_active_at(now))
            .map(|s| s.creator_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn current_subscriptions(
        &self,
        subscriber_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, StoreError> {
        let tables = self.tables.read().await;
        let mut current: Vec<Subscription> = tables
            .subscriptions
            .values()
            .filter(|s| {
                s.subscriber_id == subscriber_id
                    && s.status == SubscriptionStatus::Active
                    && s.end_date > now
            })
            .cloned()
            .collect();
        current.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(current)
    }

    async fn count_active_for_creator(
        &self,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        let count = tables
            .subscriptions
            .values()
            .filter(|s| s.creator_id == creator_id && s.is_active_at(now))
            .count();
        Ok(count as u64)
    }

    async fn subscriptions_for_creator(&self, creator_id: Uuid) -> Result<Vec<Subscription>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .subscriptions
            .values()
            .filter(|s| s.creator_id == creator_id)
            .cloned()
            .collect())
    }

    async fn get_subscription(&self, subscription_id: Uuid) -> Result<Option<Subscription>, StoreError> {
        Ok(self.tables.read().await.subscriptions.get(&subscription_id).cloned())
    }
}

#[async_trait::async_trait]
impl PaymentStore for MemoryStore {
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, StoreError> {
        Ok(self.tables.read().await.payments.get(&payment_id).cloned())
    }

    async fn payment_for_subscription(&self, subscription_id: Uuid) -> Result<Option<Payment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .values()
            .find(|p| p.subscription_id == subscription_id)
            .cloned())
    }

    async fn payments_for_subscriptions(&self, subscription_ids: &[Uuid]) -> Result<Vec<Payment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .values()
            .filter(|p| subscription_ids.contains(&p.subscription_id))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl ContentCatalog for MemoryStore {
    async fn find_content(&self, content_id: Uuid) -> Result<Option<ContentItem>, StoreError> {
        Ok(self.tables.read().await.contents.get(&content_id).cloned())
    }

    async fn insert_content(&self, item: &ContentItem) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.contents.contains_key(&item.id) {
            return Err(StoreError::Duplicate(format!("contents:{}", item.id)));
        }
        tables.contents.insert(item.id, item.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment::PaymentStatus;
    use chrono::Duration;

    fn purchase(subscriber_id: Uuid, creator_id: Uuid, now: DateTime<Utc>) -> Purchase {
        let mut subscription = Subscription::new(subscriber_id, creator_id, now);
        let payment = Payment::new(subscription.id, subscription.price, PaymentStatus::Succeeded, now);
        subscription.payment_id = payment.id;
        Purchase { subscription, payment }
    }

    #[tokio::test]
    async fn test_second_active_row_is_rejected() {
        let store = MemoryStore::new();
        let (subscriber, creator, now) = (Uuid::new_v4(), Uuid::new_v4(), Utc::now());

        store.commit_purchase(&purchase(subscriber, creator, now)).await.unwrap();
        let err = store
            .commit_purchase(&purchase(subscriber, creator, now + Duration::minutes(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SlotTaken(_)));
        assert_eq!(store.count_active_for_creator(creator, now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_payment_rolls_back_subscription() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = purchase(Uuid::new_v4(), Uuid::new_v4(), now);
        store.commit_purchase(&first).await.unwrap();

        let mut second = purchase(Uuid::new_v4(), Uuid::new_v4(), now);
        second.payment.id = first.payment.id;
        second.subscription.payment_id = first.payment.id;

        let err = store.commit_purchase(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert!(store.get_subscription(second.subscription.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_elapsed_row_releases_slot_on_next_purchase() {
        let store = MemoryStore::new();
        let (subscriber, creator, t0) = (Uuid::new_v4(), Uuid::new_v4(), Utc::now());
        let first = purchase(subscriber, creator, t0);
        store.commit_purchase(&first).await.unwrap();

        let later = t0 + Duration::days(31);
        store.commit_purchase(&purchase(subscriber, creator, later)).await.unwrap();

        let old = store.get_subscription(first.subscription.id).await.unwrap().unwrap();
        assert_eq!(old.status, SubscriptionStatus::Expired);
        assert_eq!(store.count_active_for_creator(creator, later).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancel_leaves_other_pairs_alone() {
        let store = MemoryStore::new();
        let (subscriber, now) = (Uuid::new_v4(), Utc::now());
        let (creator_a, creator_b) = (Uuid::new_v4(), Uuid::new_v4());
        store.commit_purchase(&purchase(subscriber, creator_a, now)).await.unwrap();
        store.commit_purchase(&purchase(subscriber, creator_b, now)).await.unwrap();

        assert_eq!(store.cancel_active(subscriber, creator_a, now).await.unwrap(), 1);
        assert_eq!(store.cancel_active(subscriber, creator_a, now).await.unwrap(), 0);
        assert_eq!(store.active_creator_ids(subscriber, now).await.unwrap(), vec![creator_b]);
    }

    #[tokio::test]
    async fn test_content_lookup() {
        let store = MemoryStore::new();
        let item = ContentItem::new(Uuid::new_v4(), "cover".to_string(), "bob/cover.png".to_string());
        store.insert_content(&item).await.unwrap();
        assert_eq!(store.find_content(item.id).await.unwrap(), Some(item.clone()));
        assert!(store.find_content(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.insert_content(&item).await.is_err());
    }
}
