use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use peephole_core::TrackingId;
use peephole_tracker::{OpenOutcome, PIXEL_CONTENT_TYPE, TRACKING_PIXEL};
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::extract::ClientInfo;
use crate::model::TestTrackingResponse;
use crate::state::AppState;

// Mail clients must not reuse a cached pixel, or repeat opens go unseen.
const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";

/// Open beacon. The pixel is returned whatever the outcome, including for
/// identifiers that do not even decode.
pub async fn track_open_handler(
    tracking_id: std::result::Result<Path<String>, PathRejection>,
    State(state): State<AppState>,
    client: ClientInfo,
) -> Response {
    let Ok(Path(tracking_id)) = tracking_id else {
        debug!(pipeline = "open", "undecodable tracking id");
        return pixel_response();
    };

    let visit = client.into_visit(state.clock().now());
    state
        .opens()
        .record_open(&TrackingId::new(tracking_id), &visit)
        .await;

    pixel_response()
}

/// Applies an open on behalf of a test browser and reports the new count.
pub async fn test_tracking_handler(
    Path(tracking_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TestTrackingResponse>> {
    let id = TrackingId::new(tracking_id);

    match state
        .opens()
        .record_test_open(&id, state.clock().now())
        .await
    {
        OpenOutcome::Recorded { open_count } => Ok(Json(TestTrackingResponse {
            tracking_id: id.into_inner(),
            open_count,
        })),
        OpenOutcome::Unknown => Err(ApiError::NotFound(format!(
            "tracking id not found: {id}"
        ))),
        OpenOutcome::Absorbed(err) => Err(ApiError::Storage(err)),
    }
}

fn pixel_response() -> Response {
    (
        [
            (header::CONTENT_TYPE, PIXEL_CONTENT_TYPE),
            (header::CACHE_CONTROL, NO_STORE),
        ],
        TRACKING_PIXEL,
    )
        .into_response()
}
