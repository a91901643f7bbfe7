mod config;
mod errors;
mod handlers;
mod models;
mod services;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

use services::{
    clock::{Clock, SystemClock},
    content_gate::ContentGate,
    database::DatabaseService,
    entitlement::EntitlementService,
    ledger::SubscriptionLedger,
    payment::{InstantSettlement, PaymentRecorder},
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = config::Config::from_env()?;

    let database_service = DatabaseService::new(&config.database_url).await?;
    let store = Arc::new(database_service.clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let payments = PaymentRecorder::new(Arc::new(InstantSettlement), clock.clone());
    let ledger = SubscriptionLedger::new(store.clone(), payments, clock);
    let entitlements = EntitlementService::new(ledger.clone());
    let gate = ContentGate::new(store, entitlements.clone(), &config.upload_path);

    let bind_address = config.bind_address();
    let allow_any_origin = config.server.cors_allow_any_origin;
    log::info!(
        "server_starting bind_address={} database_url={} upload_path={}",
        bind_address, config.database_url, config.upload_path
    );

    HttpServer::new(move || {
        let cors = if allow_any_origin {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
        } else {
            Cors::default()
        };

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(database_service.clone()))
            .app_data(web::Data::new(ledger.clone()))
            .app_data(web::Data::new(entitlements.clone()))
            .app_data(web::Data::new(gate.clone()))
            .service(web::scope("/api/v1").configure(handlers::configure))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
