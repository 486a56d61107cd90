use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use billmate::config::Config;
use billmate::middleware::{ApiKeyAuth, RequestId};
use billmate::modules::billing::controllers::bill_controller;
use billmate::modules::billing::repositories::{SqlBillRepository, SqlDailySequence};
use billmate::modules::billing::services::{BillNumberAllocator, BillService};
use billmate::modules::inventory::controllers::stock_controller;
use billmate::modules::inventory::repositories::SqlStockRepository;
use billmate::modules::inventory::services::StockService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billmate=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Configuration validation failed");

    tracing::info!("Starting billmate billing backend");
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    // Create database connection pool
    let db_pool = config
        .database
        .create_pool()
        .await
        .expect("Failed to create database pool");

    tracing::info!(
        "Database pool initialized ({} connections)",
        config.database.pool_size
    );

    // Wire repositories and services
    let bill_repo = Arc::new(SqlBillRepository::new(db_pool.clone()));
    let stock_repo = Arc::new(SqlStockRepository::new(db_pool.clone()));
    let sequence = Arc::new(SqlDailySequence::new(db_pool.clone()));

    let stock_service = Arc::new(StockService::new(stock_repo));
    let bill_service = Arc::new(BillService::new(
        bill_repo,
        stock_service.clone(),
        BillNumberAllocator::new(sequence),
    ));

    let bind_address = config.server.bind_address();
    let workers = config.server.workers;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(ApiKeyAuth::new(db_pool.clone()))
            .wrap(RequestId)
            .app_data(web::Data::new(bill_service.clone()))
            .app_data(web::Data::new(stock_service.clone()))
            .configure(bill_controller::configure)
            .configure(stock_controller::configure)
            .route("/health", web::get().to(health_check))
    })
    .workers(workers)
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "billmate"
    }))
}
