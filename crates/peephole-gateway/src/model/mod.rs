mod health;
mod tracking;

pub use health::HealthResponse;
pub use tracking::{DebugResponse, ErrorResponse, ListParams, TestTrackingResponse};
