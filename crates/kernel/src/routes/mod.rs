//! HTTP route handlers.

pub mod front;
pub mod health;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
///
/// The health route is merged first so `/health` never reaches the page
/// catch-all.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(front::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
