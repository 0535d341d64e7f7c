use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    click_handler, debug_handler, health_handler, recent_clicks_handler, recent_opens_handler,
    recipient_stats_handler, test_tracking_handler, track_open_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/track/{tracking_id}", get(track_open_handler))
            .route("/click/{link_id}", get(click_handler))
            .route("/test-tracking/{tracking_id}", get(test_tracking_handler))
            .route("/debug", get(debug_handler))
            .nest(
                "/api",
                Router::new()
                    .route("/stats", get(recent_opens_handler))
                    .route("/stats/{recipient}", get(recipient_stats_handler))
                    .route("/link-stats", get(recent_clicks_handler)),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
