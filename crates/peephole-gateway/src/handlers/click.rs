use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use peephole_core::LinkId;
use peephole_tracker::ClickOutcome;
use tracing::{debug, error};

use crate::extract::ClientInfo;
use crate::state::AppState;

/// Click redirect: `302` to the stored destination, `404` for unknown links,
/// `500` when the store failed. Undecodable identifiers are unknown links.
pub async fn click_handler(
    link_id: Result<Path<String>, PathRejection>,
    State(state): State<AppState>,
    client: ClientInfo,
) -> Response {
    let Ok(Path(link_id)) = link_id else {
        debug!(pipeline = "click", "undecodable link id");
        return link_not_found();
    };

    let id = LinkId::new(link_id);
    let visit = client.into_visit(state.clock().now());

    match state.clicks().record_click(&id, &visit).await {
        ClickOutcome::Redirect { location, .. } => match HeaderValue::try_from(location) {
            Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            Err(err) => {
                error!(
                    pipeline = "click",
                    link_id = %id,
                    error = %err,
                    "stored destination is not a valid Location header"
                );
                processing_error()
            }
        },
        ClickOutcome::NotFound => link_not_found(),
        ClickOutcome::Failed(_) => processing_error(),
    }
}

fn link_not_found() -> Response {
    (StatusCode::NOT_FOUND, "Link not found").into_response()
}

fn processing_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Error processing link").into_response()
}
