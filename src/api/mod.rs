use axum::{Router, routing::get};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::backend::SearchBackend;

pub mod handlers;
pub mod models;

pub fn create_router(backend: Arc<dyn SearchBackend>, static_dir: impl AsRef<Path>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Search page and its JSON endpoint
        .route("/", get(handlers::index_handler))
        .route("/results", get(handlers::results_handler))
        .with_state(backend)
        // Static assets for the page
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(cors)
}
