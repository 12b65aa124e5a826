use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{convert, handlers};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Metadata only
        .route("/info", get(handlers::video_info))
        .with_state(state.clone());

    Router::new()
        .route("/", get(convert::index))
        .route("/convert", post(convert::convert))
        .with_state(state)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
}
