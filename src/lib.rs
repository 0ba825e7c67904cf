//! Storefront API Library
//!
//! Backend for a single storefront: promotional sale pricing, session-
//! and user-scoped shopping carts, order assembly, and the atomic
//! payment commit that turns a cart into stock movement.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;
pub mod telemetry;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::{self, Next},
    response::{Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::warn;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Routes that make up the storefront API, all state-generic.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/sales", handlers::sales::sales_routes())
        .nest("/basket", handlers::basket::basket_routes())
        .merge(handlers::orders::orders_routes())
        .nest("/payment", handlers::payment::payment_routes())
        .merge(handlers::catalog::catalog_routes())
        .nest("/profile", handlers::profile::profile_routes())
}

/// Full application router: storefront routes behind the sale
/// reconciliation step, plus liveness endpoints and request telemetry.
pub fn build_router(state: AppState) -> Router {
    let storefront = api_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        reconcile_sales_middleware,
    ));

    Router::new()
        .route("/", get(|| async { "storefront-api up" }))
        .route("/health", get(health_check))
        .nest("/api", storefront)
        .layer(middleware::from_fn(telemetry::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the price ledger ahead of every storefront request.
///
/// Reconciliation is an idempotent function of store state plus today's
/// date, so invoking it per request (rather than from a scheduler) only
/// costs staleness equal to the inter-request gap. Failures are logged
/// and the request proceeds: browsing must not break because a price
/// sweep hit a transient storage error.
async fn reconcile_sales_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let today = Utc::now().date_naive();
    if let Err(err) = state.services.pricing.reconcile(today).await {
        warn!("sale reconciliation failed: {}", err);
    }
    next.run(request).await
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Json(json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
