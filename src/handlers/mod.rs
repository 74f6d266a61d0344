pub mod cars;
pub mod payments;
pub mod webhooks;

use axum::{routing::get, Router};
use serde::Serialize;

use crate::db::AppState;
use crate::extractors::Json;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/payments",
            get(payments::payments_get)
                .post(payments::payments_post)
                .put(payments::payments_put),
        )
        .route(
            "/api/webhooks",
            get(webhooks::webhooks_get)
                .post(webhooks::webhooks_post)
                .put(webhooks::webhooks_put),
        )
        .route("/api/cars", get(cars::cars_get))
}
