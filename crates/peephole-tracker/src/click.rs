use peephole_core::{Applied, LinkId, LinkRecord, StorageError, Visit};
use tracing::{debug, error, info};

use crate::SharedStore;

/// What happened to a link click.
#[derive(Debug, Clone)]
pub enum ClickOutcome {
    /// The click was counted; send the caller to `location`.
    Redirect { location: String, click_count: u64 },
    /// No link was issued with this identifier.
    NotFound,
    /// The store failed, so no destination is known.
    Failed(StorageError),
}

/// Applies outbound-link clicks to the link store.
///
/// The redirect target is whatever the issuing side stored. It is passed
/// through verbatim and never rewritten here.
#[derive(Clone)]
pub struct ClickTracker {
    store: SharedStore<LinkRecord>,
}

impl ClickTracker {
    pub fn new(store: SharedStore<LinkRecord>) -> Self {
        Self { store }
    }

    /// Counts one click on the link behind `id`.
    ///
    /// A [`ClickOutcome::Redirect`] is only produced after the store reported
    /// the update.
    pub async fn record_click(&self, id: &LinkId, visit: &Visit) -> ClickOutcome {
        match self.store.apply_event(id, visit).await {
            Ok(Applied::Updated(record)) => {
                info!(
                    pipeline = "click",
                    link_id = %id,
                    click_count = record.click_count,
                    location = %record.original_url,
                    user_agent = %visit.user_agent,
                    ip_address = ?visit.ip_address,
                    "link clicked"
                );
                ClickOutcome::Redirect {
                    location: record.original_url,
                    click_count: record.click_count,
                }
            }
            Ok(Applied::NotFound) => {
                debug!(
                    pipeline = "click",
                    link_id = %id,
                    ip_address = ?visit.ip_address,
                    "link id not found"
                );
                ClickOutcome::NotFound
            }
            Err(err) => {
                error!(
                    pipeline = "click",
                    link_id = %id,
                    seen_at = %visit.seen_at,
                    error = %err,
                    "click event failed"
                );
                ClickOutcome::Failed(err)
            }
        }
    }
}
