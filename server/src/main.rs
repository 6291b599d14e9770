//! BookYourShoot escrow service entry point

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::config::{get_reinstate_policy, MonitorConfig};
use server::db::{create_pool, run_migrations};
use server::handlers::{disputes, health, payments, payouts};
use server::services::{EscrowService, ReleaseMonitor};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "bookyourshoot.db".to_string());
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let pool = create_pool(&database_url).context("Failed to create database pool")?;

    {
        let mut conn = pool.get().context("Failed to get DB connection")?;
        run_migrations(&mut conn)?;
    }
    info!("Database ready at {database_url}");

    let service = EscrowService::new(pool.clone(), get_reinstate_policy());

    // Automatic release runs as a background poll; `release` is
    // precondition-guarded, so the cadence only bounds how late a release
    // can land, never its correctness.
    let monitor = Arc::new(ReleaseMonitor::new(
        pool.clone(),
        service.clone(),
        MonitorConfig::from_env(),
    ));
    tokio::spawn(async move {
        monitor.start_monitoring().await;
    });
    info!("ReleaseMonitor background service started");

    let service_data = web::Data::new(service);
    let pool_data = web::Data::new(pool);

    info!("Starting HTTP server on {bind_addr}");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(pool_data.clone())
            .app_data(service_data.clone())
            .service(health::health_check)
            .service(health::liveness_probe)
            .service(
                web::scope("/payments")
                    .route("/create", web::post().to(payments::create_payment))
                    .route(
                        "/admin/process/{payout_id}",
                        web::post().to(payouts::process_payout),
                    )
                    .route(
                        "/admin/reject/{payout_id}",
                        web::post().to(payouts::reject_payout),
                    )
                    .route(
                        "/admin/payouts/{payout_id}",
                        web::get().to(payouts::get_payout),
                    )
                    .route("/{id}", web::get().to(payments::get_payment))
                    .route("/{id}/countdown", web::get().to(payments::get_countdown))
                    .route("/{id}/release", web::post().to(payments::release_payment))
                    .route("/{id}/refund", web::post().to(payments::refund_payment)),
            )
            .service(
                web::scope("/disputes")
                    .route("/create", web::post().to(disputes::create_dispute))
                    .route("/{id}", web::get().to(disputes::get_dispute))
                    .route("/{id}/review", web::post().to(disputes::begin_review))
                    .route("/{id}/resolve", web::post().to(disputes::resolve_dispute)),
            )
    })
    .bind(&bind_addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")
}
