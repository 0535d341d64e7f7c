use jiff::Timestamp;
use peephole_core::{Applied, StorageError, TrackingId, TrackingRecord, Visit};
use tracing::{debug, error, info};

use crate::SharedStore;

/// User agent recorded by a manually triggered open.
pub const TEST_USER_AGENT: &str = "Test Browser";
/// Source address recorded by a manually triggered open.
pub const TEST_IP_ADDRESS: &str = "127.0.0.1";

/// What happened to a beacon hit.
///
/// The caller gets the same pixel for every variant; the distinction exists
/// for logging and for the manual test trigger.
#[derive(Debug, Clone)]
pub enum OpenOutcome {
    /// The open was counted.
    Recorded { open_count: u64 },
    /// No email was issued with this tracking identifier.
    Unknown,
    /// The store failed and the event was dropped.
    Absorbed(StorageError),
}

/// Applies email-open beacons to the tracking store.
#[derive(Clone)]
pub struct OpenTracker {
    store: SharedStore<TrackingRecord>,
}

impl OpenTracker {
    pub fn new(store: SharedStore<TrackingRecord>) -> Self {
        Self { store }
    }

    /// Counts one open of the email behind `id`.
    ///
    /// Never fails: storage errors are logged and reported as
    /// [`OpenOutcome::Absorbed`].
    pub async fn record_open(&self, id: &TrackingId, visit: &Visit) -> OpenOutcome {
        match self.store.apply_event(id, visit).await {
            Ok(Applied::Updated(record)) => {
                info!(
                    pipeline = "open",
                    tracking_id = %id,
                    open_count = record.open_count,
                    user_agent = %visit.user_agent,
                    ip_address = ?visit.ip_address,
                    "email opened"
                );
                OpenOutcome::Recorded {
                    open_count: record.open_count,
                }
            }
            Ok(Applied::NotFound) => {
                debug!(
                    pipeline = "open",
                    tracking_id = %id,
                    ip_address = ?visit.ip_address,
                    "tracking id not found"
                );
                OpenOutcome::Unknown
            }
            Err(err) => {
                error!(
                    pipeline = "open",
                    tracking_id = %id,
                    seen_at = %visit.seen_at,
                    error = %err,
                    "open event dropped, serving pixel anyway"
                );
                OpenOutcome::Absorbed(err)
            }
        }
    }

    /// Simulates an open from a test browser on the local host.
    pub async fn record_test_open(&self, id: &TrackingId, seen_at: Timestamp) -> OpenOutcome {
        let visit = Visit::builder()
            .seen_at(seen_at)
            .user_agent(TEST_USER_AGENT)
            .ip_address(TEST_IP_ADDRESS)
            .build();
        self.record_open(id, &visit).await
    }
}
