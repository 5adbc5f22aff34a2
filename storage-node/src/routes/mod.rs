pub mod health;
pub mod shares;
pub mod status;

use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/storage", get(status::get_status))
        .route("/storage/imm/SI/{storage_index}/share/{share_number}", get(shares::get_share))
        .route("/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
