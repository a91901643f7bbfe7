use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc, Duration};
use uuid::Uuid;

use crate::models::common::{SUBSCRIPTION_DURATION_DAYS, SUBSCRIPTION_PRICE_CENTS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SubscriptionStatus::Active),
            "expired" => Some(SubscriptionStatus::Expired),
            "canceled" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A subscriber's paid access to one creator for a fixed window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub subscriber_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub price: i64,
    pub status: SubscriptionStatus,
    pub payment_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Read model of a subscription as seen by its subscriber.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionView {
    pub subscription_id: Uuid,
    pub creator_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub days_remaining: i64,
    pub status: SubscriptionStatus,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntitlementStatus {
    pub subscribed: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
}

impl EntitlementStatus {
    pub fn not_subscribed() -> Self {
        Self {
            subscribed: false,
            start_date: None,
            end_date: None,
            days_remaining: None,
        }
    }
}

/// Revenue figure derived from the live active count. Not audited.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreatorStats {
    pub active_subscribers: u64,
    pub monthly_revenue_estimate: i64,
    pub currency: String,
}

/// Sum of succeeded payments over every subscription a creator ever sold.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditedRevenue {
    pub payments: u64,
    pub total_cents: i64,
    pub currency: String,
}

impl Subscription {
    /// Builds a fresh active subscription starting at `now`.
    ///
    /// `payment_id` is nil until the payment for it has been recorded.
    pub fn new(subscriber_id: Uuid, creator_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            creator_id,
            subscriber_id,
            start_date: now,
            end_date: now + Duration::days(SUBSCRIPTION_DURATION_DAYS),
            price: SUBSCRIPTION_PRICE_CENTS,
            status: SubscriptionStatus::Active,
            payment_id: Uuid::nil(),
            created_at: now,
        }
    }

    /// Live entitlement rule: stored status must be active and `now` inside
    /// `[start_date, end_date)`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.start_date <= now && now < self.end_date
    }

    /// An active row whose window is over but that nobody has re-evaluated yet.
    pub fn is_elapsed_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date <= now
    }

    pub fn days_remaining_at(&self, now: DateTime<Utc>) -> i64 {
        if !self.is_active_at(now) {
            return 0;
        }
        self.end_date.signed_duration_since(now).num_days().max(0)
    }

    pub fn cancel(&mut self) {
        self.status = SubscriptionStatus::Canceled;
    }

    pub fn expire(&mut self) {
        self.status = SubscriptionStatus::Expired;
    }

    /// Uniqueness key enforced by storage. Active rows share the pair key so
    /// a second one cannot be written; closed rows fall back to their own id.
    pub fn slot(&self) -> String {
        match self.status {
            SubscriptionStatus::Active => pair_slot(self.subscriber_id, self.creator_id),
            _ => self.id.to_string(),
        }
    }

    pub fn to_view(&self, now: DateTime<Utc>) -> SubscriptionView {
        SubscriptionView {
            subscription_id: self.id,
            creator_id: self.creator_id,
            start_date: self.start_date,
            end_date: self.end_date,
            days_remaining: self.days_remaining_at(now),
            status: self.status,
            is_active: self.is_active_at(now),
        }
    }

    pub fn to_entitlement(&self, now: DateTime<Utc>) -> EntitlementStatus {
        EntitlementStatus {
            subscribed: true,
            start_date: Some(self.start_date),
            end_date: Some(self.end_date),
            days_remaining: Some(self.days_remaining_at(now)),
        }
    }
}

fn pair_slot(subscriber_id: Uuid, creator_id: Uuid) -> String {
    format!("{}:{}", subscriber_id, creator_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription_at(now: DateTime<Utc>) -> Subscription {
        Subscription::new(Uuid::new_v4(), Uuid::new_v4(), now)
    }

    #[test]
    fn test_new_subscription_window() {
        let now = Utc::now();
        let subscription = subscription_at(now);
        assert_eq!(subscription.status, SubscriptionStatus::Active);
        assert_eq!(subscription.price, SUBSCRIPTION_PRICE_CENTS);
        assert_eq!(subscription.end_date - subscription.start_date, Duration::days(30));
        assert!(subscription.end_date > subscription.start_date);
    }

    #[test]
    fn test_window_bounds() {
        let now = Utc::now();
        let subscription = subscription_at(now);
        assert!(subscription.is_active_at(now));
        assert!(!subscription.is_active_at(now - Duration::seconds(1)));
        assert!(subscription.is_active_at(subscription.end_date - Duration::seconds(1)));
        assert!(!subscription.is_active_at(subscription.end_date));
        assert!(subscription.is_elapsed_at(subscription.end_date));
    }

    #[test]
    fn test_days_remaining() {
        let now = Utc::now();
        let subscription = subscription_at(now);
        assert_eq!(subscription.days_remaining_at(now), 30);
        assert_eq!(subscription.days_remaining_at(now + Duration::hours(36)), 28);
        assert_eq!(subscription.days_remaining_at(now + Duration::days(31)), 0);
    }

    #[test]
    fn test_canceled_is_never_active() {
        let now = Utc::now();
        let mut subscription = subscription_at(now);
        subscription.cancel();
        assert!(!subscription.is_active_at(now));
        assert_eq!(subscription.days_remaining_at(now), 0);
    }

    #[test]
    fn test_slot_released_when_closed() {
        let now = Utc::now();
        let mut subscription = subscription_at(now);
        assert_eq!(
            subscription.slot(),
            pair_slot(subscription.subscriber_id, subscription.creator_id)
        );
        subscription.expire();
        assert_eq!(subscription.slot(), subscription.id.to_string());
    }

    #[test]
    fn test_status_literals() {
        assert_eq!(serde_json::to_string(&SubscriptionStatus::Canceled).unwrap(), "\"canceled\"");
        assert_eq!(SubscriptionStatus::parse("expired"), Some(SubscriptionStatus::Expired));
        assert_eq!(SubscriptionStatus::parse("cancelled"), None);
    }
}
