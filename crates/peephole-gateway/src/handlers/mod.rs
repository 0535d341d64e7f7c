mod click;
mod health;
mod stats;
mod track;

pub use click::click_handler;
pub use health::health_handler;
pub use stats::{debug_handler, recent_clicks_handler, recent_opens_handler, recipient_stats_handler};
pub use track::{test_tracking_handler, track_open_handler};
