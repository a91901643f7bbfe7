use actix_web::web::{Data, Path};
use actix_web::{delete, get, post, HttpResponse};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::LedgerError;
use crate::handlers::Caller;
use crate::models::common::{
    cents_to_decimal, subscription_price, ApiResponse, CURRENCY, SUBSCRIPTION_DURATION_DAYS,
    SUBSCRIPTION_PRICE_CENTS,
};
use crate::models::subscription::SubscriptionView;
use crate::services::entitlement::EntitlementService;
use crate::services::ledger::SubscriptionLedger;

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub subscription_id: Uuid,
    pub creator_id: Uuid,
    pub price: Decimal,
    pub price_cents: i64,
    pub currency: &'static str,
    pub duration_days: i64,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct EntitlementResponse {
    pub subscribed: bool,
    pub price: Decimal,
    pub duration_days: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FollowedResponse {
    pub creator_ids: Vec<Uuid>,
    pub count: usize,
    pub total_cost: Decimal,
}

#[derive(Debug, Serialize)]
pub struct MySubscriptionsResponse {
    pub subscriptions: Vec<SubscriptionView>,
    pub count: usize,
    pub total_cost: Decimal,
}

/// What the caller pays per period for `count` subscriptions.
fn total_cost(count: usize) -> Decimal {
    cents_to_decimal(count as i64 * SUBSCRIPTION_PRICE_CENTS)
}

#[post("/{creator_id}")]
pub async fn subscribe(
    ledger: Data<SubscriptionLedger>,
    caller: Caller,
    path: Path<Uuid>,
) -> Result<HttpResponse, LedgerError> {
    let creator_id = path.into_inner();
    let subscription = ledger.subscribe(caller.0, creator_id).await?;

    let body = SubscribeResponse {
        subscription_id: subscription.id,
        creator_id,
        price: cents_to_decimal(subscription.price),
        price_cents: subscription.price,
        currency: CURRENCY,
        duration_days: SUBSCRIPTION_DURATION_DAYS,
        end_date: subscription.end_date,
    };
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        body,
        "Subscription created".to_string(),
    )))
}

#[delete("/{creator_id}")]
pub async fn unsubscribe(
    ledger: Data<SubscriptionLedger>,
    caller: Caller,
    path: Path<Uuid>,
) -> Result<HttpResponse, LedgerError> {
    let creator_id = path.into_inner();
    ledger.unsubscribe(caller.0, creator_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        serde_json::json!({ "creator_id": creator_id }),
        "Subscription canceled".to_string(),
    )))
}

#[get("/{creator_id}")]
pub async fn check_entitlement(
    entitlements: Data<EntitlementService>,
    caller: Caller,
    path: Path<Uuid>,
) -> Result<HttpResponse, LedgerError> {
    let status = entitlements.check(caller.0, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(EntitlementResponse {
        subscribed: status.subscribed,
        price: subscription_price(),
        duration_days: SUBSCRIPTION_DURATION_DAYS,
        start_date: status.start_date,
        end_date: status.end_date,
        days_remaining: status.days_remaining,
    })))
}

#[get("")]
pub async fn list_followed(
    entitlements: Data<EntitlementService>,
    caller: Caller,
) -> Result<HttpResponse, LedgerError> {
    let creator_ids = entitlements.followed_creator_ids(caller.0).await?;
    let count = creator_ids.len();

    Ok(HttpResponse::Ok().json(ApiResponse::success(FollowedResponse {
        creator_ids,
        count,
        total_cost: total_cost(count),
    })))
}

#[get("/my")]
pub async fn list_my_subscriptions(
    entitlements: Data<EntitlementService>,
    caller: Caller,
) -> Result<HttpResponse, LedgerError> {
    let subscriptions = entitlements.subscriptions(caller.0).await?;
    let count = subscriptions.len();

    Ok(HttpResponse::Ok().json(ApiResponse::success(MySubscriptionsResponse {
        subscriptions,
        count,
        total_cost: total_cost(count),
    })))
}
