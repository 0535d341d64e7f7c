use std::path::PathBuf;

use jiff::Timestamp;
use peephole_core::{Clock, LinkId, LinkRecord, SystemClock, TrackingId, TrackingRecord, Visit};
use peephole_storage::{connect, Applied, RecordStore, SqliteStore, StorageError};

struct Fixture {
    tracking: SqliteStore<TrackingRecord>,
    links: SqliteStore<LinkRecord>,
}

impl Fixture {
    async fn start() -> Self {
        let pool = connect("sqlite::memory:").await.expect("open sqlite");

        Self {
            tracking: SqliteStore::new(pool.clone()),
            links: SqliteStore::new(pool),
        }
    }
}

fn ts(seconds: i64) -> Timestamp {
    Timestamp::from_second(seconds).unwrap()
}

fn visit(seconds: i64, agent: &str) -> Visit {
    Visit::builder()
        .seen_at(ts(seconds))
        .user_agent(agent)
        .ip_address("203.0.113.7")
        .build()
}

fn tracking(id: &str, recipient: &str, sent_at: i64) -> TrackingRecord {
    TrackingRecord::builder()
        .tracking_id(id)
        .recipient_email(recipient)
        .subject(format!("Subject {id}"))
        .sent_at(ts(sent_at))
        .build()
}

fn link(id: &str, url: &str, created_at: i64) -> LinkRecord {
    LinkRecord::builder()
        .link_id(id)
        .original_url(url)
        .email_id("abc123")
        .recipient_email("a@x.com")
        .created_at(ts(created_at))
        .build()
}

fn unique_temp_db_path() -> PathBuf {
    let nanos = Timestamp::now().as_nanosecond();
    std::env::temp_dir().join(format!(
        "peephole-test-{}-{nanos}.db",
        std::process::id()
    ))
}

#[tokio::test]
async fn insert_and_get_tracking_record() {
    let fixture = Fixture::start().await;
    fixture
        .tracking
        .insert(&tracking("abc123", "a@x.com", 100))
        .await
        .unwrap();

    let got = fixture
        .tracking
        .get(&TrackingId::new("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got, tracking("abc123", "a@x.com", 100));
}

#[tokio::test]
async fn insert_conflicts_when_id_already_exists() {
    let fixture = Fixture::start().await;
    fixture
        .tracking
        .insert(&tracking("abc123", "a@x.com", 100))
        .await
        .unwrap();

    let err = fixture
        .tracking
        .insert(&tracking("abc123", "b@x.com", 200))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn opens_update_count_and_last_seen() {
    let fixture = Fixture::start().await;
    let id = TrackingId::new("abc123");
    fixture
        .tracking
        .insert(&tracking("abc123", "a@x.com", 100))
        .await
        .unwrap();

    let first = fixture
        .tracking
        .apply_event(&id, &visit(200, "Mail/1.0"))
        .await
        .unwrap()
        .updated()
        .expect("record should exist");
    assert_eq!(first.open_count, 1);
    assert_eq!(first.opened_at, Some(ts(200)));

    fixture
        .tracking
        .apply_event(&id, &visit(300, "Mail/2.0"))
        .await
        .unwrap();

    let stored = fixture.tracking.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.open_count, 2);
    assert_eq!(stored.opened_at, Some(ts(300)));
    assert_eq!(stored.user_agent.as_deref(), Some("Mail/2.0"));
    assert_eq!(stored.ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(stored.subject, "Subject abc123");
}

#[tokio::test]
async fn open_on_unknown_id_creates_no_row() {
    let fixture = Fixture::start().await;
    let id = TrackingId::new("missing");

    let outcome = fixture
        .tracking
        .apply_event(&id, &visit(200, "Mail/1.0"))
        .await
        .unwrap();

    assert_eq!(outcome, Applied::NotFound);
    assert!(fixture.tracking.get(&id).await.unwrap().is_none());
    assert_eq!(fixture.tracking.count().await.unwrap(), 0);
}

#[tokio::test]
async fn click_returns_stored_destination() {
    let fixture = Fixture::start().await;
    fixture
        .links
        .insert(&link("lnk1", "https://example.com/promo", 100))
        .await
        .unwrap();

    let updated = fixture
        .links
        .apply_event(&LinkId::new("lnk1"), &visit(200, "Browser"))
        .await
        .unwrap()
        .updated()
        .expect("link should exist");

    assert_eq!(updated.original_url, "https://example.com/promo");
    assert_eq!(updated.click_count, 1);
    assert_eq!(updated.last_clicked, Some(ts(200)));
    assert_eq!(updated.email_id.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn click_on_unknown_link_leaves_table_unchanged() {
    let fixture = Fixture::start().await;
    fixture
        .links
        .insert(&link("lnk1", "https://example.com/promo", 100))
        .await
        .unwrap();

    let outcome = fixture
        .links
        .apply_event(&LinkId::new("nope"), &visit(200, "Browser"))
        .await
        .unwrap();

    assert_eq!(outcome, Applied::NotFound);
    assert_eq!(fixture.links.count().await.unwrap(), 1);
    let untouched = fixture
        .links
        .get(&LinkId::new("lnk1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.click_count, 0);
    assert_eq!(untouched.last_clicked, None);
}

#[tokio::test]
async fn list_recent_tracking_orders_by_sent_time() {
    let fixture = Fixture::start().await;
    for (id, sent_at) in [("a", 100), ("b", 300), ("c", 200), ("d", 300)] {
        fixture
            .tracking
            .insert(&tracking(id, "a@x.com", sent_at))
            .await
            .unwrap();
    }

    let recent = fixture.tracking.list_recent(3).await.unwrap();
    let ids: Vec<_> = recent.iter().map(|r| r.tracking_id.as_str()).collect();
    assert_eq!(ids, ["b", "d", "c"]);
}

#[tokio::test]
async fn list_recent_links_puts_unclicked_last() {
    let fixture = Fixture::start().await;
    fixture
        .links
        .insert(&link("old", "https://one.example", 100))
        .await
        .unwrap();
    fixture
        .links
        .insert(&link("new", "https://two.example", 300))
        .await
        .unwrap();
    fixture
        .links
        .insert(&link("clicked", "https://three.example", 50))
        .await
        .unwrap();
    fixture
        .links
        .apply_event(&LinkId::new("clicked"), &visit(400, "Browser"))
        .await
        .unwrap();

    let recent = fixture.links.list_recent(10).await.unwrap();
    let ids: Vec<_> = recent.iter().map(|r| r.link_id.as_str()).collect();
    assert_eq!(ids, ["clicked", "new", "old"]);
}

#[tokio::test]
async fn list_for_recipient_filters_and_orders() {
    let fixture = Fixture::start().await;
    fixture
        .tracking
        .insert(&tracking("a", "a@x.com", 100))
        .await
        .unwrap();
    fixture
        .tracking
        .insert(&tracking("b", "b@x.com", 200))
        .await
        .unwrap();
    fixture
        .tracking
        .insert(&tracking("c", "a@x.com", 300))
        .await
        .unwrap();

    let records = fixture
        .tracking
        .list_for_recipient("a@x.com", 100)
        .await
        .unwrap();
    let ids: Vec<_> = records.iter().map(|r| r.tracking_id.as_str()).collect();
    assert_eq!(ids, ["c", "a"]);
}

#[tokio::test]
async fn concurrent_opens_are_all_counted() {
    let fixture = Fixture::start().await;
    fixture
        .tracking
        .insert(&tracking("abc123", "a@x.com", 100))
        .await
        .unwrap();
    let mut handles = vec![];

    for i in 0..32 {
        let store = fixture.tracking.clone();
        handles.push(tokio::spawn(async move {
            store
                .apply_event(&TrackingId::new("abc123"), &visit(1_000 + i, "Prefetch"))
                .await
                .unwrap();
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    let record = fixture
        .tracking
        .get(&TrackingId::new("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.open_count, 32);
}

#[tokio::test]
async fn file_database_persists_across_pools() {
    let path = unique_temp_db_path();
    let url = format!("sqlite://{}", path.display());

    {
        let store: SqliteStore<TrackingRecord> = SqliteStore::new(connect(&url).await.unwrap());
        store
            .insert(&tracking("abc123", "a@x.com", 100))
            .await
            .unwrap();
        store
            .apply_event(&TrackingId::new("abc123"), &visit(200, "Mail/1.0"))
            .await
            .unwrap();
        store.pool().close().await;
    }

    let store: SqliteStore<TrackingRecord> = SqliteStore::new(connect(&url).await.unwrap());
    let record = store
        .get(&TrackingId::new("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.open_count, 1);
    assert_eq!(record.opened_at, Some(ts(200)));
    store.pool().close().await;

    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_opens_on_file_database_are_all_counted() {
    let path = unique_temp_db_path();
    let url = format!("sqlite://{}", path.display());
    let store: SqliteStore<TrackingRecord> = SqliteStore::new(connect(&url).await.unwrap());
    store
        .insert(&tracking("abc123", "a@x.com", 100))
        .await
        .unwrap();
    let mut handles = vec![];

    for i in 0..200 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .apply_event(&TrackingId::new("abc123"), &visit(1_000 + i, "Prefetch"))
                .await
        }));
    }

    for handle in handles {
        let applied = handle.await.unwrap().unwrap();
        assert!(matches!(applied, Applied::Updated(_)));
    }

    let record = store
        .get(&TrackingId::new("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.open_count, 200);
    store.pool().close().await;

    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

#[tokio::test]
async fn system_clock_event_time_is_stored_exactly() {
    let fixture = Fixture::start().await;
    fixture
        .tracking
        .insert(&tracking("abc123", "a@x.com", 100))
        .await
        .unwrap();
    let seen_at = SystemClock.now();
    let event = Visit::builder().seen_at(seen_at).build();

    let applied = fixture
        .tracking
        .apply_event(&TrackingId::new("abc123"), &event)
        .await
        .unwrap()
        .updated()
        .unwrap();
    assert_eq!(applied.opened_at, Some(seen_at));

    let stored = fixture
        .tracking
        .get(&TrackingId::new("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.opened_at, Some(seen_at));
}
