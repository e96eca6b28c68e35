use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{admin, handlers, middleware::metrics_middleware, queue};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Waiting room
        .route("/queue/join", get(queue::join).post(queue::join))
        .route("/queue/status", get(queue::status))
        .route("/queue/stats", get(queue::stats))
        // Operator
        .route("/admin/admit", post(admin::admit))
        .route("/admin/rate", put(admin::set_rate))
        .route("/admin/worker", get(admin::worker_status))
        .route_layer(middleware::from_fn(metrics_middleware))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
}
