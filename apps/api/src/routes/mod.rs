pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::contract::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_status))
        .route("/health", get(health::health_handler))
        .route(
            "/generate-contract",
            post(handlers::handle_generate_contract),
        )
        .with_state(state)
}
