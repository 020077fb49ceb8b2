//! Axum router construction for the observer API.
//!
//! Assembles the dashboard and operator routes into a single [`Router`]
//! with request tracing and permissive CORS for the dashboard.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fleet_db::EntityStore;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;

/// Build the complete router.
///
/// See [`handlers`] and [`operator`] for the endpoint tables. CORS allows
/// any origin so the dashboard can be served from elsewhere during
/// development.
pub fn build_router<S: EntityStore>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index::<S>))
        // Dashboard reads
        .route("/api/robots", get(handlers::list_robots::<S>))
        .route("/api/packages", get(handlers::list_packages::<S>))
        .route("/api/bins", get(handlers::list_bins::<S>))
        .route("/api/overview", get(handlers::get_overview::<S>))
        // Bin maintenance
        .route(
            "/api/bins/{id}/maintenance",
            post(handlers::set_maintenance::<S>),
        )
        .route(
            "/api/bins/{id}/toggle-maintenance",
            post(handlers::toggle_maintenance::<S>),
        )
        // Operator
        .route("/api/operator/status", get(operator::status::<S>))
        .route("/api/operator/start", post(operator::start::<S>))
        .route("/api/operator/pause", post(operator::pause::<S>))
        .route(
            "/api/operator/emergency-stop",
            post(operator::emergency_stop::<S>),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
