use surrealdb::{Surreal, engine::local::{Db, Mem}};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};

use crate::errors::StoreError;
use crate::models::{
    content::{ContentItem, ModerationStatus},
    payment::{Payment, PaymentStatus},
    subscription::{Subscription, SubscriptionStatus},
};
use crate::services::store::{ContentCatalog, PaymentStore, Purchase, SubscriptionStore};

const UNIQUE_SLOT_INDEX: &str = "unique_active_slot";

/// SurrealDB-backed store. Rows carry their ids as plain string fields and
/// timestamps as unix milliseconds so range filters compare integers.
#[derive(Clone)]
pub struct DatabaseService {
    db: Surreal<Db>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SubscriptionRow {
    subscription_id: String,
    creator_id: String,
    subscriber_id: String,
    start_at: i64,
    end_at: i64,
    price: i64,
    status: String,
    payment_id: String,
    created_at: i64,
    slot: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PaymentRow {
    payment_id: String,
    subscription_id: String,
    amount: i64,
    paid_at: i64,
    status: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentRow {
    content_id: String,
    creator_id: String,
    title: String,
    file_path: String,
    status: String,
    created_at: i64,
}

impl DatabaseService {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = if database_url.starts_with("memory://") {
            Surreal::new::<Mem>(()).await?
        } else if let Some(path) = database_url.strip_prefix("file://") {
            Self::open_file(path).await?
        } else {
            return Err(anyhow!("Unsupported database URL: {}", database_url));
        };

        db.use_ns("creator_ledger").use_db("main").await?;

        let service = Self { db };
        service.initialize_schema().await?;

        Ok(service)
    }

    #[cfg(feature = "persistent")]
    async fn open_file(path: &str) -> Result<Surreal<Db>> {
        Ok(Surreal::new::<surrealdb::engine::local::RocksDb>(path).await?)
    }

    #[cfg(not(feature = "persistent"))]
    async fn open_file(path: &str) -> Result<Surreal<Db>> {
        Err(anyhow!(
            "file-backed database {} requires the `persistent` feature",
            path
        ))
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.db.query("
            DEFINE TABLE subscriptions SCHEMAFULL;
            DEFINE FIELD subscription_id ON subscriptions TYPE string;
            DEFINE FIELD creator_id ON subscriptions TYPE string;
            DEFINE FIELD subscriber_id ON subscriptions TYPE string;
            DEFINE FIELD start_at ON subscriptions TYPE int;
            DEFINE FIELD end_at ON subscriptions TYPE int;
            DEFINE FIELD price ON subscriptions TYPE int;
            DEFINE FIELD status ON subscriptions TYPE string ASSERT $value INSIDE ['active', 'expired', 'canceled'];
            DEFINE FIELD payment_id ON subscriptions TYPE string;
            DEFINE FIELD created_at ON subscriptions TYPE int;
            DEFINE FIELD slot ON subscriptions TYPE string;
            DEFINE INDEX unique_active_slot ON subscriptions COLUMNS slot UNIQUE;
            DEFINE INDEX subscriptions_by_pair ON subscriptions COLUMNS subscriber_id, creator_id;
        ").await?.check()?;

        self.db.query("
            DEFINE TABLE payments SCHEMAFULL;
            DEFINE FIELD payment_id ON payments TYPE string;
            DEFINE FIELD subscription_id ON payments TYPE string;
            DEFINE FIELD amount ON payments TYPE int;
            DEFINE FIELD paid_at ON payments TYPE int;
            DEFINE FIELD status ON payments TYPE string ASSERT $value INSIDE ['pending', 'succeeded', 'failed'];
            DEFINE INDEX unique_payment_per_subscription ON payments COLUMNS subscription_id UNIQUE;
        ").await?.check()?;

        self.db.query("
            DEFINE TABLE contents SCHEMAFULL;
            DEFINE FIELD content_id ON contents TYPE string;
            DEFINE FIELD creator_id ON contents TYPE string;
            DEFINE FIELD title ON contents TYPE string;
            DEFINE FIELD file_path ON contents TYPE string;
            DEFINE FIELD status ON contents TYPE string;
            DEFINE FIELD created_at ON contents TYPE int;
        ").await?.check()?;

        log::info!("Database schema initialized successfully");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<()> {
        self.db.health().await?;
        Ok(())
    }

    async fn select_subscriptions(
        &self,
        filter: &str,
        bindings: Vec<(&'static str, String)>,
        now: Option<DateTime<Utc>>,
    ) -> Result<Vec<Subscription>, StoreError> {
        let sql = format!("SELECT * FROM subscriptions WHERE {} ORDER BY created_at DESC", filter);
        let mut query = self.db.query(sql);
        for binding in bindings {
            query = query.bind(binding);
        }
        if let Some(now) = now {
            query = query.bind(("now", now.timestamp_millis()));
        }
        let rows: Vec<SubscriptionRow> = query.await?.take(0)?;
        rows.into_iter().map(SubscriptionRow::into_subscription).collect()
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for DatabaseService {
    async fn commit_purchase(&self, purchase: &Purchase) -> Result<(), StoreError> {
        let subscription = SubscriptionRow::from(&purchase.subscription);
        let payment = PaymentRow::from(&purchase.payment);

        let mut response = self.db
            .query("
                BEGIN TRANSACTION;
                UPDATE subscriptions SET status = 'expired', slot = subscription_id
                    WHERE subscriber_id = $subscriber AND creator_id = $creator
                    AND status = 'active' AND end_at <= $now;
                CREATE type::thing('subscriptions', $subscription_key) CONTENT $subscription;
                CREATE type::thing('payments', $payment_key) CONTENT $payment;
                COMMIT TRANSACTION;
            ")
            .bind(("subscriber", subscription.subscriber_id.clone()))
            .bind(("creator", subscription.creator_id.clone()))
            .bind(("now", subscription.start_at))
            .bind(("subscription_key", subscription.subscription_id.clone()))
            .bind(("payment_key", payment.payment_id.clone()))
            .bind(("subscription", subscription))
            .bind(("payment", payment))
            .await?;

        let errors = response.take_errors();
        if errors.is_empty() {
            return Ok(());
        }

        let messages: Vec<String> = errors.into_values().map(|e| e.to_string()).collect();
        if messages.iter().any(|m| m.contains(UNIQUE_SLOT_INDEX)) {
            return Err(StoreError::SlotTaken(purchase.subscription.slot()));
        }
        if messages.iter().any(|m| m.contains("already exists")) {
            return Err(StoreError::Duplicate(purchase.subscription.id.to_string()));
        }
        Err(StoreError::Rollback(messages.join("; ")))
    }

    async fn find_active(
        &self,
        subscriber_id: Uuid,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Subscription>, StoreError> {
        let found = self
            .select_subscriptions(
                "subscriber_id = $subscriber AND creator_id = $creator AND status = 'active' \
                 AND start_at <= $now AND end_at > $now",
                vec![
                    ("subscriber", subscriber_id.to_string()),
                    ("creator", creator_id.to_string()),
                ],
                Some(now),
            )
            .await?;
        Ok(found.into_iter().next())
    }

    async fn cancel_active(
        &self,
        subscriber_id: Uuid,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let canceled: Vec<serde_json::Value> = self.db
            .query("
                UPDATE subscriptions SET status = 'canceled', slot = subscription_id
                    WHERE subscriber_id = $subscriber AND creator_id = $creator
                    AND status = 'active' AND start_at <= $now AND end_at > $now
                    RETURN subscription_id;
            ")
            .bind(("subscriber", subscriber_id.to_string()))
            .bind(("creator", creator_id.to_string()))
            .bind(("now", now.timestamp_millis()))
            .await?
            .take(0)?;
        Ok(canceled.len() as u64)
    }

    async fn active_creator_ids(
        &self,
        subscriber_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, StoreError> {
        let ids: Vec<String> = self.db
            .query("
                SELECT VALUE creator_id FROM subscriptions
                    WHERE subscriber_id = $subscriber AND status = 'active'
                    AND start_at <= $now AND end_at > $now;
            ")
            .bind(("subscriber", subscriber_id.to_string()))
            .bind(("now", now.timestamp_millis()))
            .await?
            .take(0)?;

        let mut ids = ids.iter().map(|id| parse_uuid(id)).collect::<Result<Vec<_>, _>>()?;
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn current_subscriptions(
        &self,
        subscriber_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Subscription>, StoreError> {
        self.select_subscriptions(
            "subscriber_id = $subscriber AND status = 'active' AND end_at > $now",
            vec![("subscriber", subscriber_id.to_string())],
            Some(now),
        )
        .await
    }

    async fn count_active_for_creator(
        &self,
        creator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result: Vec<serde_json::Value> = self.db
            .query("
                SELECT count() FROM subscriptions
                    WHERE creator_id = $creator AND status = 'active'
                    AND start_at <= $now AND end_at > $now
                    GROUP ALL;
            ")
            .bind(("creator", creator_id.to_string()))
            .bind(("now", now.timestamp_millis()))
            .await?
            .take(0)?;
        Ok(extract_count(&result))
    }

    async fn subscriptions_for_creator(&self, creator_id: Uuid) -> Result<Vec<Subscription>, StoreError> {
        self.select_subscriptions(
            "creator_id = $creator",
            vec![("creator", creator_id.to_string())],
            None,
        )
        .await
    }

    async fn get_subscription(&self, subscription_id: Uuid) -> Result<Option<Subscription>, StoreError> {
        let found = self
            .select_subscriptions(
                "subscription_id = $subscription",
                vec![("subscription", subscription_id.to_string())],
                None,
            )
            .await?;
        Ok(found.into_iter().next())
    }
}

#[async_trait::async_trait]
impl PaymentStore for DatabaseService {
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, StoreError> {
        let rows: Vec<PaymentRow> = self.db
            .query("SELECT * FROM payments WHERE payment_id = $payment")
            .bind(("payment", payment_id.to_string()))
            .await?
            .take(0)?;
        rows.into_iter().next().map(PaymentRow::into_payment).transpose()
    }

    async fn payment_for_subscription(&self, subscription_id: Uuid) -> Result<Option<Payment>, StoreError> {
        let rows: Vec<PaymentRow> = self.db
            .query("SELECT * FROM payments WHERE subscription_id = $subscription")
            .bind(("subscription", subscription_id.to_string()))
            .await?
            .take(0)?;
        rows.into_iter().next().map(PaymentRow::into_payment).transpose()
    }

    async fn payments_for_subscriptions(&self, subscription_ids: &[Uuid]) -> Result<Vec<Payment>, StoreError> {
        if subscription_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = subscription_ids.iter().map(Uuid::to_string).collect();
        let rows: Vec<PaymentRow> = self.db
            .query("SELECT * FROM payments WHERE subscription_id INSIDE $subscriptions")
            .bind(("subscriptions", ids))
            .await?
            .take(0)?;
        rows.into_iter().map(PaymentRow::into_payment).collect()
    }
}

#[async_trait::async_trait]
impl ContentCatalog for DatabaseService {
    async fn find_content(&self, content_id: Uuid) -> Result<Option<ContentItem>, StoreError> {
        let rows: Vec<ContentRow> = self.db
            .query("SELECT * FROM contents WHERE content_id = $content")
            .bind(("content", content_id.to_string()))
            .await?
            .take(0)?;
        rows.into_iter().next().map(ContentRow::into_item).transpose()
    }

    async fn insert_content(&self, item: &ContentItem) -> Result<(), StoreError> {
        let row = ContentRow::from(item);
        let mut response = self.db
            .query("CREATE type::thing('contents', $key) CONTENT $row")
            .bind(("key", row.content_id.clone()))
            .bind(("row", row))
            .await?;
        let errors = response.take_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Duplicate(format!("contents:{}", item.id)))
        }
    }
}

impl From<&Subscription> for SubscriptionRow {
    fn from(s: &Subscription) -> Self {
        Self {
            subscription_id: s.id.to_string(),
            creator_id: s.creator_id.to_string(),
            subscriber_id: s.subscriber_id.to_string(),
            start_at: s.start_date.timestamp_millis(),
            end_at: s.end_date.timestamp_millis(),
            price: s.price,
            status: s.status.as_str().to_string(),
            payment_id: s.payment_id.to_string(),
            created_at: s.created_at.timestamp_millis(),
            slot: s.slot(),
        }
    }
}

impl SubscriptionRow {
    fn into_subscription(self) -> Result<Subscription, StoreError> {
        Ok(Subscription {
            id: parse_uuid(&self.subscription_id)?,
            creator_id: parse_uuid(&self.creator_id)?,
            subscriber_id: parse_uuid(&self.subscriber_id)?,
            start_date: parse_millis(self.start_at)?,
            end_date: parse_millis(self.end_at)?,
            price: self.price,
            status: SubscriptionStatus::parse(&self.status)
                .ok_or_else(|| StoreError::Corrupt(format!("subscription status {}", self.status)))?,
            payment_id: parse_uuid(&self.payment_id)?,
            created_at: parse_millis(self.created_at)?,
        })
    }
}

impl From<&Payment> for PaymentRow {
    fn from(p: &Payment) -> Self {
        Self {
            payment_id: p.id.to_string(),
            subscription_id: p.subscription_id.to_string(),
            amount: p.amount,
            paid_at: p.paid_at.timestamp_millis(),
            status: p.status.as_str().to_string(),
        }
    }
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, StoreError> {
        Ok(Payment {
            id: parse_uuid(&self.payment_id)?,
            subscription_id: parse_uuid(&self.subscription_id)?,
            amount: self.amount,
            paid_at: parse_millis(self.paid_at)?,
            status: PaymentStatus::parse(&self.status)
                .ok_or_else(|| StoreError::Corrupt(format!("payment status {}", self.status)))?,
        })
    }
}

impl From<&ContentItem> for ContentRow {
    fn from(c: &ContentItem) -> Self {
        Self {
            content_id: c.id.to_string(),
            creator_id: c.creator_id.to_string(),
            title: c.title.clone(),
            file_path: c.file_path.clone(),
            status: c.status.as_str().to_string(),
            created_at: c.created_at.timestamp_millis(),
        }
    }
}

impl ContentRow {
    fn into_item(self) -> Result<ContentItem, StoreError> {
        Ok(ContentItem {
            id: parse_uuid(&self.content_id)?,
            creator_id: parse_uuid(&self.creator_id)?,
            title: self.title,
            file_path: self.file_path,
            status: ModerationStatus::parse(&self.status)
                .ok_or_else(|| StoreError::Corrupt(format!("moderation status {}", self.status)))?,
            created_at: parse_millis(self.created_at)?,
        })
    }
}

fn parse_uuid(value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value).map_err(|e| StoreError::Corrupt(format!("id {}: {}", value, e)))
}

fn parse_millis(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp {}", millis)))
}

fn extract_count(result: &[serde_json::Value]) -> u64 {
    result.first()
        .and_then(|v| v.get("count"))
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}
