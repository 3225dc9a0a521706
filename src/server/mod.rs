pub mod routes;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Full HTTP surface over the given state. Also used directly by tests.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/calculate", post(routes::create_calculation))
        .route("/api/calculate/batch", post(routes::batch_calculate))
        .route(
            "/api/history",
            get(routes::list_history).delete(routes::delete_history),
        )
        .route("/api/history/count", get(routes::history_count))
        .route("/api/history/{id}", get(routes::get_calculation))
        .route("/api/counters", get(routes::get_counters))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
