pub mod health;
pub mod pages;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(pages::handle_index))
        .route("/upload", post(pages::handle_upload))
        .route("/query", post(pages::handle_query))
        .route("/clear", post(pages::handle_clear))
        .route("/health", get(health::health_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

#[cfg(test)]
mod tests;
