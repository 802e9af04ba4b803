//! Route configuration.

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{health_routes, user_routes};
use crate::state::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/users", user_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
