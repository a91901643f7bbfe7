use actix_web::web::Data;
use actix_web::HttpResponse;

use crate::models::common::ApiResponse;
use crate::services::database::DatabaseService;

pub async fn health_check(db: Data<DatabaseService>) -> HttpResponse {
    match db.health_check().await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
            "status": "healthy",
            "service": "creator-ledger",
            "timestamp": chrono::Utc::now(),
        }))),
        Err(e) => {
            log::error!("health_check_failed error={}", e);
            HttpResponse::ServiceUnavailable().json(ApiResponse::error(format!("storage unavailable: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::tests::TestApp;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn test_health() {
        let root = tempfile::tempdir().unwrap();
        let state = TestApp::new(root.path()).await;
        let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
