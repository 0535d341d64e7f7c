use jiff::Timestamp;
use peephole_core::{LinkRecord, Result, TrackingRecord};
use serde::Serialize;
use tracing::trace;

use crate::SharedStore;

/// Listing size used when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 100;
/// Upper bound on any listing.
pub const MAX_LIMIT: usize = 1000;

/// Per-email view returned by the recipient lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailStats {
    pub tracking_id: String,
    pub subject: String,
    pub sent_at: Timestamp,
    pub opened_at: Option<Timestamp>,
    pub open_count: u64,
}

impl From<TrackingRecord> for EmailStats {
    fn from(record: TrackingRecord) -> Self {
        Self {
            tracking_id: record.tracking_id.into_inner(),
            subject: record.subject,
            sent_at: record.sent_at,
            opened_at: record.opened_at,
            open_count: record.open_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientSummary {
    pub recipient: String,
    pub emails: Vec<EmailStats>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub tracking_records: u64,
    pub link_records: u64,
}

/// Read-only queries over both stores.
///
/// Nothing is cached: every call reads the current store state.
#[derive(Clone)]
pub struct StatsReader {
    tracking: SharedStore<TrackingRecord>,
    links: SharedStore<LinkRecord>,
}

impl StatsReader {
    pub fn new(tracking: SharedStore<TrackingRecord>, links: SharedStore<LinkRecord>) -> Self {
        Self { tracking, links }
    }

    /// Most recently sent emails first.
    pub async fn recent_opens(&self, limit: Option<usize>) -> Result<Vec<TrackingRecord>> {
        let limit = clamp_limit(limit);
        trace!(limit, "listing recent tracking records");
        self.tracking.list_recent(limit).await
    }

    /// Most recently clicked links first, never-clicked links last.
    pub async fn recent_clicks(&self, limit: Option<usize>) -> Result<Vec<LinkRecord>> {
        let limit = clamp_limit(limit);
        trace!(limit, "listing recent link records");
        self.links.list_recent(limit).await
    }

    /// Every tracked email sent to `recipient`, newest first.
    pub async fn recipient_opens(&self, recipient: &str) -> Result<RecipientSummary> {
        let records = self
            .tracking
            .list_for_recipient(recipient, MAX_LIMIT)
            .await?;

        Ok(RecipientSummary {
            recipient: recipient.to_string(),
            emails: records.into_iter().map(EmailStats::from).collect(),
        })
    }

    pub async fn store_counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            tracking_records: self.tracking.count().await?,
            link_records: self.links.count().await?,
        })
    }
}

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}
