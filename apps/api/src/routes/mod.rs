pub mod capture;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/capture", post(capture::handle_capture))
        .with_state(state)
}
