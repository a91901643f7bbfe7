use actix_web::web::{Data, Path};
use actix_web::{get, HttpResponse};
use uuid::Uuid;

use crate::errors::LedgerError;
use crate::models::common::ApiResponse;
use crate::services::entitlement::EntitlementService;

/// Live subscriber count and the revenue estimate derived from it.
#[get("/{creator_id}/stats")]
pub async fn creator_stats(
    entitlements: Data<EntitlementService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, LedgerError> {
    let stats = entitlements.creator_stats(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(stats)))
}

/// Settled payments actually taken for the creator, history included.
#[get("/{creator_id}/revenue")]
pub async fn audited_revenue(
    entitlements: Data<EntitlementService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, LedgerError> {
    let revenue = entitlements.audited_revenue(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(revenue)))
}
