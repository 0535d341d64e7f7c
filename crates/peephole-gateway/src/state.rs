use std::sync::Arc;

use peephole_core::{Clock, LinkRecord, TrackingRecord};
use peephole_tracker::{ClickTracker, OpenTracker, SharedStore, StatsReader};

#[derive(Clone)]
pub struct AppState {
    opens: OpenTracker,
    clicks: ClickTracker,
    stats: StatsReader,
    clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        tracking: SharedStore<TrackingRecord>,
        links: SharedStore<LinkRecord>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            opens: OpenTracker::new(Arc::clone(&tracking)),
            clicks: ClickTracker::new(Arc::clone(&links)),
            stats: StatsReader::new(tracking, links),
            clock,
        }
    }

    pub fn opens(&self) -> &OpenTracker {
        &self.opens
    }

    pub fn clicks(&self) -> &ClickTracker {
        &self.clicks
    }

    pub fn stats(&self) -> &StatsReader {
        &self.stats
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}
