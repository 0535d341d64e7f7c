//! HTTP transport for the tracking pipelines.
//!
//! - `GET /track/{tracking_id}`: open beacon, always answers with the pixel
//! - `GET /click/{link_id}`: click redirect, `302` / `404` / `500`
//! - `GET /api/stats`, `GET /api/link-stats`, `GET /api/stats/{recipient}`:
//!   read-only listings for the reporting pages
//! - `GET /test-tracking/{tracking_id}`, `GET /debug`, `GET /health`:
//!   operator helpers

pub mod app;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use error::ApiError;
pub use state::AppState;
