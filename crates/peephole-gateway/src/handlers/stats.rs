use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use peephole_core::{LinkRecord, TrackingRecord};
use peephole_tracker::RecipientSummary;

use crate::error::Result;
use crate::model::{DebugResponse, ListParams};
use crate::state::AppState;

pub async fn recent_opens_handler(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<TrackingRecord>>> {
    let Query(params) = params?;
    let records = state.stats().recent_opens(params.limit).await?;
    Ok(Json(records))
}

pub async fn recent_clicks_handler(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<LinkRecord>>> {
    let Query(params) = params?;
    let records = state.stats().recent_clicks(params.limit).await?;
    Ok(Json(records))
}

pub async fn recipient_stats_handler(
    Path(recipient): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RecipientSummary>> {
    let summary = state.stats().recipient_opens(&recipient).await?;
    Ok(Json(summary))
}

/// Row counts plus the most recent records of both tables.
pub async fn debug_handler(State(state): State<AppState>) -> Result<Json<DebugResponse>> {
    let counts = state.stats().store_counts().await?;
    let emails = state.stats().recent_opens(None).await?;
    let links = state.stats().recent_clicks(None).await?;

    Ok(Json(DebugResponse {
        tracking_records: counts.tracking_records,
        link_records: counts.link_records,
        emails,
        links,
    }))
}
