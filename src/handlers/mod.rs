pub mod contents;
pub mod creators;
pub mod health;
pub mod subscriptions;

use actix_web::dev::Payload;
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse, ResponseError};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::errors::{ContentError, LedgerError};
use crate::models::common::ApiResponse;

/// Header the upstream auth layer sets to the authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Uuid);

impl FromRequest for Caller {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let caller = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok());

        ready(match caller {
            Some(id) => Ok(Caller(id)),
            None => {
                let body = ApiResponse::error(format!("missing or invalid {} header", USER_ID_HEADER));
                Err(InternalError::from_response(
                    "unauthenticated",
                    HttpResponse::Unauthorized().json(body),
                )
                .into())
            }
        })
    }
}

/// Mounts every route under the caller's scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions")
            .service(subscriptions::list_followed)
            .service(subscriptions::list_my_subscriptions)
            .service(subscriptions::subscribe)
            .service(subscriptions::unsubscribe)
            .service(subscriptions::check_entitlement),
    )
    .service(
        web::scope("/creators")
            .service(creators::creator_stats)
            .service(creators::audited_revenue),
    )
    .service(
        web::scope("/contents")
            .service(contents::view_content)
            .service(contents::download_content),
    )
    .route("/health", web::get().to(health::health_check));
}

impl ResponseError for LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::AlreadySubscribed => StatusCode::CONFLICT,
            LedgerError::SelfSubscription => StatusCode::BAD_REQUEST,
            LedgerError::NoActiveSubscription | LedgerError::NotFound => StatusCode::NOT_FOUND,
            LedgerError::PaymentDeclined { .. } => StatusCode::PAYMENT_REQUIRED,
            LedgerError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_body(self.status_code(), self)
    }
}

impl ResponseError for ContentError {
    fn status_code(&self) -> StatusCode {
        match self {
            ContentError::ContentNotFound(_) | ContentError::AssetMissingOnStorage(_) => StatusCode::NOT_FOUND,
            ContentError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ContentError::Entitlement(inner) => inner.status_code(),
            ContentError::DecodeFailure(_)
            | ContentError::EncodeFailure(_)
            | ContentError::Io(_)
            | ContentError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_body(self.status_code(), self)
    }
}

fn error_body(status: StatusCode, err: &dyn std::fmt::Display) -> HttpResponse {
    // Storage internals stay in the log.
    let message = if status.is_server_error() {
        log::error!("request_failed status={} error={}", status.as_u16(), err);
        "internal server error".to_string()
    } else {
        err.to_string()
    };
    HttpResponse::build(status).json(ApiResponse::error(message))
}
