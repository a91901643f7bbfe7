use uuid::Uuid;

use crate::errors::LedgerError;
use crate::models::common::{CURRENCY, SUBSCRIPTION_PRICE_CENTS};
use crate::models::payment::Payment;
use crate::models::subscription::{AuditedRevenue, CreatorStats, EntitlementStatus, SubscriptionView};
use crate::services::clock::Clock;
use crate::services::ledger::SubscriptionLedger;
use crate::services::store::{PaymentStore, SubscriptionStore};

/// Read-only questions about who follows whom. Every answer is computed from
/// the live time window, never from a cached flag.
#[derive(Clone)]
pub struct EntitlementService {
    ledger: SubscriptionLedger,
}

impl EntitlementService {
    pub fn new(ledger: SubscriptionLedger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &SubscriptionLedger {
        &self.ledger
    }

    pub async fn is_entitled(&self, subscriber_id: Uuid, creator_id: Uuid) -> Result<bool, LedgerError> {
        self.ledger.is_active_now(subscriber_id, creator_id).await
    }

    pub async fn check(&self, subscriber_id: Uuid, creator_id: Uuid) -> Result<EntitlementStatus, LedgerError> {
        let now = self.ledger.clock().now();
        match self.ledger.active_record(subscriber_id, creator_id).await {
            Ok(subscription) => Ok(subscription.to_entitlement(now)),
            Err(LedgerError::NotFound) => Ok(EntitlementStatus::not_subscribed()),
            Err(e) => Err(e),
        }
    }

    pub async fn followed_creator_ids(&self, subscriber_id: Uuid) -> Result<Vec<Uuid>, LedgerError> {
        let now = self.ledger.clock().now();
        let ids = self.ledger.store().active_creator_ids(subscriber_id, now).await?;
        Ok(ids)
    }

    /// Subscriptions the subscriber currently holds, newest first.
    pub async fn subscriptions(&self, subscriber_id: Uuid) -> Result<Vec<SubscriptionView>, LedgerError> {
        let now = self.ledger.clock().now();
        let current = self.ledger.store().current_subscriptions(subscriber_id, now).await?;
        let views: Vec<SubscriptionView> = current.iter().map(|s| s.to_view(now)).collect();

        log::info!(
            "user_subscriptions_retrieved user_id={} count={}",
            subscriber_id,
            views.len()
        );
        Ok(views)
    }

    /// Estimate only: live active count times the fixed price. Use
    /// [`audited_revenue`](Self::audited_revenue) for money actually taken.
    pub async fn creator_stats(&self, creator_id: Uuid) -> Result<CreatorStats, LedgerError> {
        let now = self.ledger.clock().now();
        let active = self.ledger.store().count_active_for_creator(creator_id, now).await?;
        let stats = CreatorStats {
            active_subscribers: active,
            monthly_revenue_estimate: active as i64 * SUBSCRIPTION_PRICE_CENTS,
            currency: CURRENCY.to_string(),
        };

        log::info!(
            "creator_stats_retrieved creator_id={} active_subscriptions={} monthly_revenue={}",
            creator_id, stats.active_subscribers, stats.monthly_revenue_estimate
        );
        Ok(stats)
    }

    pub async fn audited_revenue(&self, creator_id: Uuid) -> Result<AuditedRevenue, LedgerError> {
        let store = self.ledger.store();
        let subscription_ids: Vec<Uuid> = store
            .subscriptions_for_creator(creator_id)
            .await?
            .iter()
            .map(|s| s.id)
            .collect();

        let settled: Vec<_> = store
            .payments_for_subscriptions(&subscription_ids)
            .await?
            .into_iter()
            .filter(Payment::is_settled)
            .collect();

        Ok(AuditedRevenue {
            payments: settled.len() as u64,
            total_cents: settled.iter().map(|p| p.amount).sum(),
            currency: CURRENCY.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::subscription::SubscriptionStatus;
    use crate::services::clock::ManualClock;
    use crate::services::ledger::tests::ledger_with;
    use crate::services::memory::MemoryStore;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn setup() -> (EntitlementService, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (EntitlementService::new(ledger_with(store, clock.clone())), clock)
    }

    #[tokio::test]
    async fn test_creator_stats_ignore_history() {
        let (service, clock) = setup();
        let creator = Uuid::new_v4();
        let ledger = service.ledger();

        // Two subscribers who lapsed, one who canceled.
        for _ in 0..2 {
            ledger.subscribe(Uuid::new_v4(), creator).await.unwrap();
        }
        let quitter = Uuid::new_v4();
        ledger.subscribe(quitter, creator).await.unwrap();
        ledger.unsubscribe(quitter, creator).await.unwrap();
        clock.advance(Duration::days(31));

        for _ in 0..4 {
            ledger.subscribe(Uuid::new_v4(), creator).await.unwrap();
        }

        let stats = service.creator_stats(creator).await.unwrap();
        assert_eq!(stats.active_subscribers, 4);
        assert_eq!(stats.monthly_revenue_estimate, 4 * SUBSCRIPTION_PRICE_CENTS);
        assert_eq!(stats.currency, "EUR");

        let audited = service.audited_revenue(creator).await.unwrap();
        assert_eq!(audited.payments, 7);
        assert_eq!(audited.total_cents, 7 * SUBSCRIPTION_PRICE_CENTS);
    }

    #[tokio::test]
    async fn test_followed_creators_only_live() {
        let (service, clock) = setup();
        let subscriber = Uuid::new_v4();
        let (old, fresh) = (Uuid::new_v4(), Uuid::new_v4());

        service.ledger().subscribe(subscriber, old).await.unwrap();
        clock.advance(Duration::days(20));
        service.ledger().subscribe(subscriber, fresh).await.unwrap();
        clock.advance(Duration::days(15));

        assert_eq!(service.followed_creator_ids(subscriber).await.unwrap(), vec![fresh]);
    }

    #[tokio::test]
    async fn test_subscription_views_carry_days_remaining() {
        let (service, clock) = setup();
        let (subscriber, creator) = (Uuid::new_v4(), Uuid::new_v4());
        service.ledger().subscribe(subscriber, creator).await.unwrap();
        clock.advance(Duration::days(10) + Duration::hours(6));

        let views = service.subscriptions(subscriber).await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].creator_id, creator);
        assert_eq!(views[0].days_remaining, 19);
        assert_eq!(views[0].status, SubscriptionStatus::Active);
        assert!(views[0].is_active);

        clock.advance(Duration::days(20));
        assert!(service.subscriptions(subscriber).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_reports_window() {
        let (service, clock) = setup();
        let (subscriber, creator) = (Uuid::new_v4(), Uuid::new_v4());

        let status = service.check(subscriber, creator).await.unwrap();
        assert_eq!(status, EntitlementStatus::not_subscribed());

        let subscription = service.ledger().subscribe(subscriber, creator).await.unwrap();
        let status = service.check(subscriber, creator).await.unwrap();
        assert!(status.subscribed);
        assert_eq!(status.end_date, Some(subscription.end_date));
        assert_eq!(status.days_remaining, Some(30));
        assert!(service.is_entitled(subscriber, creator).await.unwrap());

        clock.set(subscription.end_date);
        assert!(!service.check(subscriber, creator).await.unwrap().subscribed);
        assert_eq!(clock.now(), subscription.end_date);
    }
}
