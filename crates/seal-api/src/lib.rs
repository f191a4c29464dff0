//! # seal-api — Axum HTTP Service for Seal Tracking
//!
//! REST backend tracking physical tamper-evident security seals:
//! generation (single and bulk), technician assignment, the
//! issue/use/install/return/cancel lifecycle, and an append-only audit
//! log of every transition.
//!
//! ## API Surface
//!
//! | Prefix               | Module                  | Domain              |
//! |----------------------|-------------------------|---------------------|
//! | `/api/seals/*`       | [`routes::seals`]       | Inventory & lifecycle |
//! | `/api/technicians/*` | [`routes::technicians`] | Field technicians   |
//! | `/api/auth/*`        | [`routes::auth`]        | User login          |
//! | `/api/logs/*`        | [`routes::logs`]        | Audit log (admin)   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → AuthMiddleware → Handler
//! ```
//!
//! Login, registration, and the health probe are mounted outside the
//! auth middleware. Everything else requires a bearer JWT.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod lifecycle;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let keys = state.auth.clone();

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::seals::router())
        .merge(routes::technicians::router())
        .merge(routes::logs::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(axum::Extension(keys));

    // Unauthenticated surface: health probe, user login, technician
    // registration and login.
    let public = Router::new()
        .route("/api/health", axum::routing::get(health))
        .merge(routes::auth::public_router())
        .merge(routes::technicians::public_router());

    Router::new()
        .merge(public)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe — returns 200 if the process is running.
async fn health() -> &'static str {
    "ok"
}
