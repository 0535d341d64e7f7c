use peephole_core::{LinkRecord, TrackingRecord};
use serde::{Deserialize, Serialize};

/// Query string of the listing endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestTrackingResponse {
    pub tracking_id: String,
    pub open_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugResponse {
    pub tracking_records: u64,
    pub link_records: u64,
    pub emails: Vec<TrackingRecord>,
    pub links: Vec<LinkRecord>,
}
