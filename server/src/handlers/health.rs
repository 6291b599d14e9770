//! Health check endpoints for monitoring

use actix_web::{get, web, HttpResponse, Responder};
use serde::Serialize;
use std::time::Instant;

use crate::db::DbPool;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: ComponentHealth,
}

/// Health status of a component
#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64) -> Self {
        Self {
            status: "healthy",
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy",
            latency_ms: None,
            error: Some(error),
        }
    }
}

/// Service health including database connectivity.
///
/// # Endpoint
/// `GET /health`
#[get("/health")]
pub async fn health_check(pool: web::Data<DbPool>) -> impl Responder {
    let db_health = check_database_health(&pool).await;

    let overall_status = if db_health.status == "healthy" {
        "healthy"
    } else {
        "unhealthy"
    };

    let response = HealthResponse {
        status: overall_status,
        service: "bookyourshoot-escrow",
        version: env!("CARGO_PKG_VERSION"),
        database: db_health,
    };

    if overall_status == "healthy" {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

/// Liveness probe.
///
/// Returns 200 if the process is alive; used by orchestrators to decide
/// whether to restart the instance.
#[get("/live")]
pub async fn liveness_probe() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "alive": true,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Check database health with a trivial query.
async fn check_database_health(pool: &DbPool) -> ComponentHealth {
    let start = Instant::now();

    match pool.get() {
        Ok(mut conn) => {
            let result = web::block(move || {
                use diesel::prelude::*;
                diesel::sql_query("SELECT 1 AS val").execute(&mut conn)
            })
            .await;

            match result {
                Ok(Ok(_)) => ComponentHealth::healthy(start.elapsed().as_millis() as u64),
                Ok(Err(e)) => ComponentHealth::unhealthy(format!("Query failed: {e}")),
                Err(e) => ComponentHealth::unhealthy(format!("Block error: {e}")),
            }
        }
        Err(e) => ComponentHealth::unhealthy(format!("Connection failed: {e}")),
    }
}
