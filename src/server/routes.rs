use crate::server::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_routes(state: AppState, allow_any_origin: bool) -> Router {
    let cors = if allow_any_origin {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        // Health check
        .route("/", get(handlers::health))
        // Single-URL crawling
        .route("/api/v1/crawl", post(handlers::crawl))
        .route("/api/v1/extract", post(handlers::extract))
        // Batch jobs
        .route("/api/v1/crawl/batch", post(handlers::submit_batch))
        .route(
            "/api/v1/crawl/batch/:job_id",
            get(handlers::batch_status).delete(handlers::cancel_batch),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
