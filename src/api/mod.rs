use axum::{Router, routing::post};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};

use crate::session::Assistant;

pub mod handlers;
pub mod models;

#[derive(Clone)]
pub struct AppState {
    /// `None` when the assistant could not be built at startup.
    pub assistant: Option<Arc<dyn Assistant>>,
}

impl AppState {
    pub fn new(assistant: Option<Arc<dyn Assistant>>) -> Self {
        AppState { assistant }
    }
}

pub fn create_router(state: AppState, static_dir: &str) -> Router {
    // CORS for the API only
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/chat", post(handlers::chat_handler))
        .layer(cors)
        .with_state(state);

    // Landing page and assets
    api.fallback_service(ServeDir::new(static_dir))
}
