use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::{LedgerError, StoreError};
use crate::models::subscription::Subscription;
use crate::services::clock::Clock;
use crate::services::payment::PaymentRecorder;
use crate::services::store::{LedgerStore, Purchase, SubscriptionStore};

/// Sole writer of subscription rows and the authority on who is entitled
/// to which creator.
#[derive(Clone)]
pub struct SubscriptionLedger {
    store: Arc<dyn LedgerStore>,
    payments: PaymentRecorder,
    clock: Arc<dyn Clock>,
}

impl SubscriptionLedger {
    pub fn new(store: Arc<dyn LedgerStore>, payments: PaymentRecorder, clock: Arc<dyn Clock>) -> Self {
        Self { store, payments, clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Buys a subscription to `creator_id` for the fixed price.
    ///
    /// The subscription and its payment are committed together. The
    /// pre-check only saves a round trip; the store's slot constraint is what
    /// actually prevents two concurrent purchases from both landing.
    pub async fn subscribe(&self, subscriber_id: Uuid, creator_id: Uuid) -> Result<Subscription, LedgerError> {
        log::info!(
            "subscription_attempt subscriber_id={} creator_id={}",
            subscriber_id, creator_id
        );

        if subscriber_id == creator_id {
            log::info!("self_subscription_attempt user_id={}", subscriber_id);
            return Err(LedgerError::SelfSubscription);
        }

        let now = self.clock.now();
        if self.store.find_active(subscriber_id, creator_id, now).await?.is_some() {
            log::info!(
                "subscription_already_exists subscriber_id={} creator_id={}",
                subscriber_id, creator_id
            );
            return Err(LedgerError::AlreadySubscribed);
        }

        let mut subscription = Subscription::new(subscriber_id, creator_id, now);
        let payment = self.payments.record_payment(subscription.id, subscription.price)?;
        subscription.payment_id = payment.id;

        let purchase = Purchase { subscription, payment };
        match self.store.commit_purchase(&purchase).await {
            Ok(()) => {}
            Err(StoreError::SlotTaken(_)) => {
                log::info!(
                    "subscription_already_exists subscriber_id={} creator_id={} detected_by=store",
                    subscriber_id, creator_id
                );
                return Err(LedgerError::AlreadySubscribed);
            }
            Err(e) => {
                log::error!(
                    "subscription_transaction_failed subscriber_id={} creator_id={} error={}",
                    subscriber_id, creator_id, e
                );
                return Err(LedgerError::Persistence(e));
            }
        }

        let Purchase { subscription, payment } = purchase;
        log::info!(
            "subscription_created subscription_id={} payment_id={} subscriber_id={} creator_id={} amount_cents={} end_date={}",
            subscription.id, payment.id, subscriber_id, creator_id, payment.amount, subscription.end_date
        );
        Ok(subscription)
    }

    /// Cancels the pair's live subscription. Fails without touching anything
    /// when there is none.
    pub async fn unsubscribe(&self, subscriber_id: Uuid, creator_id: Uuid) -> Result<(), LedgerError> {
        log::info!(
            "unsubscription_attempt subscriber_id={} creator_id={}",
            subscriber_id, creator_id
        );

        let canceled = self
            .store
            .cancel_active(subscriber_id, creator_id, self.clock.now())
            .await
            .map_err(|e| {
                log::error!(
                    "unsubscription_failed subscriber_id={} creator_id={} error={}",
                    subscriber_id, creator_id, e
                );
                LedgerError::Persistence(e)
            })?;

        if canceled == 0 {
            log::info!(
                "unsubscription_not_found subscriber_id={} creator_id={}",
                subscriber_id, creator_id
            );
            return Err(LedgerError::NoActiveSubscription);
        }

        log::info!(
            "unsubscription_success subscriber_id={} creator_id={} rows_affected={}",
            subscriber_id, creator_id, canceled
        );
        Ok(())
    }

    /// Live window check. A row whose stored status still says active but
    /// whose end date has passed does not count.
    pub async fn is_active(
        &self,
        subscriber_id: Uuid,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        Ok(self.store.find_active(subscriber_id, creator_id, now).await?.is_some())
    }

    pub async fn is_active_now(&self, subscriber_id: Uuid, creator_id: Uuid) -> Result<bool, LedgerError> {
        self.is_active(subscriber_id, creator_id, self.clock.now()).await
    }

    pub async fn active_record(&self, subscriber_id: Uuid, creator_id: Uuid) -> Result<Subscription, LedgerError> {
        self.store
            .find_active(subscriber_id, creator_id, self.clock.now())
            .await?
            .ok_or(LedgerError::NotFound)
    }

    pub(crate) fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }
}
