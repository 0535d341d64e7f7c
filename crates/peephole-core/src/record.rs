use crate::id::{LinkId, TrackingId};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Display;
use typed_builder::TypedBuilder;

/// User agent recorded when the transport supplies none.
pub const UNKNOWN_USER_AGENT: &str = "Unknown";

/// Metadata of a single open or click event.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct Visit {
    /// When the event was observed.
    pub seen_at: Timestamp,
    #[builder(default = UNKNOWN_USER_AGENT.to_string(), setter(into))]
    pub user_agent: String,
    /// Source address of the request, when the transport knows it.
    #[builder(default, setter(strip_option, into))]
    pub ip_address: Option<String>,
}

/// A persisted record that counts events against an identifier.
///
/// Both record kinds share the same update shape, so stores can be written
/// once and instantiated per kind.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: AsRef<str> + Display + Clone + Send + Sync + 'static;

    /// Short name of the record kind, used in logs.
    const KIND: &'static str;

    fn id(&self) -> &Self::Id;

    fn recipient(&self) -> &str;

    /// Number of events applied since creation.
    fn event_count(&self) -> u64;

    /// Applies one event: bumps the counter, refreshes the event timestamp and
    /// overwrites the last-seen fields.
    fn apply_visit(&mut self, visit: &Visit);

    /// Orders records most recent first.
    fn recency_cmp(&self, other: &Self) -> Ordering;
}

/// A sent email whose opens are tracked through a beacon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct TrackingRecord {
    #[builder(setter(into))]
    pub tracking_id: TrackingId,
    #[builder(setter(into))]
    pub recipient_email: String,
    #[builder(setter(into))]
    pub subject: String,
    pub sent_at: Timestamp,
    /// Time of the latest open, `None` until the first one.
    #[builder(default)]
    pub opened_at: Option<Timestamp>,
    #[builder(default)]
    pub open_count: u64,
    #[builder(default, setter(strip_option, into))]
    pub user_agent: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub ip_address: Option<String>,
}

impl Record for TrackingRecord {
    type Id = TrackingId;

    const KIND: &'static str = "tracking";

    fn id(&self) -> &TrackingId {
        &self.tracking_id
    }

    fn recipient(&self) -> &str {
        &self.recipient_email
    }

    fn event_count(&self) -> u64 {
        self.open_count
    }

    fn apply_visit(&mut self, visit: &Visit) {
        self.open_count = self.open_count.saturating_add(1);
        self.opened_at = Some(visit.seen_at);
        self.user_agent = Some(visit.user_agent.clone());
        self.ip_address = visit.ip_address.clone();
    }

    fn recency_cmp(&self, other: &Self) -> Ordering {
        other
            .sent_at
            .cmp(&self.sent_at)
            .then_with(|| self.tracking_id.cmp(&other.tracking_id))
    }
}

/// A rewritten outbound link whose clicks are tracked through a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct LinkRecord {
    #[builder(setter(into))]
    pub link_id: LinkId,
    /// Destination the click is redirected to, stored verbatim.
    #[builder(setter(into))]
    pub original_url: String,
    /// Tracking identifier of the email carrying the link.
    #[builder(default, setter(strip_option, into))]
    pub email_id: Option<String>,
    #[builder(setter(into))]
    pub recipient_email: String,
    pub created_at: Timestamp,
    #[builder(default)]
    pub click_count: u64,
    #[builder(default)]
    pub last_clicked: Option<Timestamp>,
    #[builder(default, setter(strip_option, into))]
    pub user_agent: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub ip_address: Option<String>,
}

impl Record for LinkRecord {
    type Id = LinkId;

    const KIND: &'static str = "link";

    fn id(&self) -> &LinkId {
        &self.link_id
    }

    fn recipient(&self) -> &str {
        &self.recipient_email
    }

    fn event_count(&self) -> u64 {
        self.click_count
    }

    fn apply_visit(&mut self, visit: &Visit) {
        self.click_count = self.click_count.saturating_add(1);
        self.last_clicked = Some(visit.seen_at);
        self.user_agent = Some(visit.user_agent.clone());
        self.ip_address = visit.ip_address.clone();
    }

    // Never-clicked links sort after clicked ones, `None < Some` reversed.
    fn recency_cmp(&self, other: &Self) -> Ordering {
        (other.last_clicked, other.created_at)
            .cmp(&(self.last_clicked, self.created_at))
            .then_with(|| self.link_id.cmp(&other.link_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(seconds: i64) -> Timestamp {
        Timestamp::from_second(seconds).unwrap()
    }

    fn visit(seconds: i64, agent: &str, ip: &str) -> Visit {
        Visit::builder()
            .seen_at(ts(seconds))
            .user_agent(agent)
            .ip_address(ip)
            .build()
    }

    fn tracking(id: &str, sent_at: i64) -> TrackingRecord {
        TrackingRecord::builder()
            .tracking_id(id)
            .recipient_email("a@x.com")
            .subject("Hello")
            .sent_at(ts(sent_at))
            .build()
    }

    fn link(id: &str, created_at: i64, last_clicked: Option<i64>) -> LinkRecord {
        let mut record = LinkRecord::builder()
            .link_id(id)
            .original_url("https://example.com/promo")
            .recipient_email("a@x.com")
            .created_at(ts(created_at))
            .build();
        if let Some(at) = last_clicked {
            record.apply_visit(&visit(at, "agent", "10.0.0.1"));
        }
        record
    }

    #[test]
    fn new_tracking_record_is_unopened() {
        let record = tracking("abc123", 100);
        assert_eq!(record.open_count, 0);
        assert_eq!(record.opened_at, None);
        assert_eq!(record.user_agent, None);
    }

    #[test]
    fn open_increments_and_overwrites() {
        let mut record = tracking("abc123", 100);

        record.apply_visit(&visit(200, "Mail/1.0", "10.0.0.1"));
        assert_eq!(record.open_count, 1);
        assert_eq!(record.opened_at, Some(ts(200)));

        record.apply_visit(&visit(300, "Mail/2.0", "10.0.0.2"));
        assert_eq!(record.open_count, 2);
        assert_eq!(record.opened_at, Some(ts(300)));
        assert_eq!(record.user_agent.as_deref(), Some("Mail/2.0"));
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.2"));
        assert_eq!(record.subject, "Hello");
    }

    #[test]
    fn visit_without_address_clears_previous_address() {
        let mut record = tracking("abc123", 100);
        record.apply_visit(&visit(200, "Mail/1.0", "10.0.0.1"));

        record.apply_visit(&Visit::builder().seen_at(ts(300)).build());

        assert_eq!(record.ip_address, None);
        assert_eq!(record.user_agent.as_deref(), Some(UNKNOWN_USER_AGENT));
    }

    #[test]
    fn click_keeps_destination() {
        let mut record = link("lnk1", 100, None);
        record.apply_visit(&visit(200, "Browser", "10.0.0.1"));

        assert_eq!(record.click_count, 1);
        assert_eq!(record.last_clicked, Some(ts(200)));
        assert_eq!(record.original_url, "https://example.com/promo");
    }

    #[test]
    fn tracking_records_order_by_sent_time() {
        let mut records = vec![tracking("b", 100), tracking("c", 300), tracking("a", 100)];
        records.sort_by(TrackingRecord::recency_cmp);

        let ids: Vec<_> = records.iter().map(|r| r.tracking_id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn links_order_by_last_click_then_creation() {
        let mut records = vec![
            link("never-old", 100, None),
            link("clicked-early", 50, Some(200)),
            link("never-new", 300, None),
            link("clicked-late", 10, Some(400)),
        ];
        records.sort_by(LinkRecord::recency_cmp);

        let ids: Vec<_> = records.iter().map(|r| r.link_id.as_str()).collect();
        assert_eq!(
            ids,
            ["clicked-late", "clicked-early", "never-new", "never-old"]
        );
    }
}
