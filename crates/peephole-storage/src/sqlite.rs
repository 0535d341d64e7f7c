use async_trait::async_trait;
use jiff::Timestamp;
use peephole_core::{
    Applied, LinkRecord, Record, RecordStore, Result, StorageError, TrackingRecord, Visit,
};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::marker::PhantomData;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, trace};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const MAX_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite pool and brings the schema up to date.
///
/// File databases are created if missing and run in WAL mode with a busy
/// timeout so concurrent writers queue instead of failing. In-memory databases
/// exist per connection, so they get a single connection that is never
/// recycled.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

    let mut options = SqliteConnectOptions::from_str(database_url)
        .map_err(map_sqlx_error)?
        .create_if_missing(true)
        .busy_timeout(BUSY_TIMEOUT);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| StorageError::Operation(format!("schema migration failed: {e}")))?;

    debug!(database_url, in_memory, "sqlite store ready");
    Ok(pool)
}

/// A record kind persisted in its own SQLite table.
///
/// Each statement returns the full column set decoded by [`Self::from_row`].
/// `APPLY_EVENT` binds, in order: event time (ms), user agent, source address,
/// identifier.
pub trait SqliteRecord: Record {
    const TABLE: &'static str;
    const SELECT_ONE: &'static str;
    const APPLY_EVENT: &'static str;
    const LIST_RECENT: &'static str;
    const LIST_FOR_RECIPIENT: &'static str;
    const COUNT: &'static str;

    fn from_row(row: &SqliteRow) -> Result<Self>;
}

impl SqliteRecord for TrackingRecord {
    const TABLE: &'static str = "email_tracking";

    const SELECT_ONE: &'static str = r#"
        SELECT tracking_id, recipient_email, subject, sent_at, opened_at,
               open_count, user_agent, ip_address
        FROM email_tracking
        WHERE tracking_id = ?
        LIMIT 1
        "#;

    const APPLY_EVENT: &'static str = r#"
        UPDATE email_tracking
        SET open_count = COALESCE(open_count, 0) + 1,
            opened_at = ?,
            user_agent = ?,
            ip_address = ?
        WHERE tracking_id = ?
        RETURNING tracking_id, recipient_email, subject, sent_at, opened_at,
                  open_count, user_agent, ip_address
        "#;

    const LIST_RECENT: &'static str = r#"
        SELECT tracking_id, recipient_email, subject, sent_at, opened_at,
               open_count, user_agent, ip_address
        FROM email_tracking
        ORDER BY sent_at DESC, tracking_id ASC
        LIMIT ?
        "#;

    const LIST_FOR_RECIPIENT: &'static str = r#"
        SELECT tracking_id, recipient_email, subject, sent_at, opened_at,
               open_count, user_agent, ip_address
        FROM email_tracking
        WHERE recipient_email = ?
        ORDER BY sent_at DESC, tracking_id ASC
        LIMIT ?
        "#;

    const COUNT: &'static str = "SELECT COUNT(*) FROM email_tracking";

    fn from_row(row: &SqliteRow) -> Result<Self> {
        let tracking_id: String = row.try_get("tracking_id").map_err(map_sqlx_error)?;
        let sent_at: i64 = row.try_get("sent_at").map_err(map_sqlx_error)?;
        let opened_at: Option<i64> = row.try_get("opened_at").map_err(map_sqlx_error)?;
        let open_count: Option<i64> = row.try_get("open_count").map_err(map_sqlx_error)?;

        Ok(TrackingRecord {
            tracking_id: tracking_id.into(),
            recipient_email: row.try_get("recipient_email").map_err(map_sqlx_error)?,
            subject: row.try_get("subject").map_err(map_sqlx_error)?,
            sent_at: parse_millis("sent_at", sent_at)?,
            opened_at: opened_at
                .map(|value| parse_millis("opened_at", value))
                .transpose()?,
            open_count: parse_count("open_count", open_count)?,
            user_agent: row.try_get("user_agent").map_err(map_sqlx_error)?,
            ip_address: row.try_get("ip_address").map_err(map_sqlx_error)?,
        })
    }
}

impl SqliteRecord for LinkRecord {
    const TABLE: &'static str = "link_tracking";

    const SELECT_ONE: &'static str = r#"
        SELECT link_id, original_url, email_id, recipient_email, created_at,
               click_count, last_clicked, user_agent, ip_address
        FROM link_tracking
        WHERE link_id = ?
        LIMIT 1
        "#;

    const APPLY_EVENT: &'static str = r#"
        UPDATE link_tracking
        SET click_count = COALESCE(click_count, 0) + 1,
            last_clicked = ?,
            user_agent = ?,
            ip_address = ?
        WHERE link_id = ?
        RETURNING link_id, original_url, email_id, recipient_email, created_at,
                  click_count, last_clicked, user_agent, ip_address
        "#;

    // SQLite sorts NULL lowest, so never-clicked links come last.
    const LIST_RECENT: &'static str = r#"
        SELECT link_id, original_url, email_id, recipient_email, created_at,
               click_count, last_clicked, user_agent, ip_address
        FROM link_tracking
        ORDER BY last_clicked DESC, created_at DESC, link_id ASC
        LIMIT ?
        "#;

    const LIST_FOR_RECIPIENT: &'static str = r#"
        SELECT link_id, original_url, email_id, recipient_email, created_at,
               click_count, last_clicked, user_agent, ip_address
        FROM link_tracking
        WHERE recipient_email = ?
        ORDER BY last_clicked DESC, created_at DESC, link_id ASC
        LIMIT ?
        "#;

    const COUNT: &'static str = "SELECT COUNT(*) FROM link_tracking";

    fn from_row(row: &SqliteRow) -> Result<Self> {
        let link_id: String = row.try_get("link_id").map_err(map_sqlx_error)?;
        let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
        let last_clicked: Option<i64> = row.try_get("last_clicked").map_err(map_sqlx_error)?;
        let click_count: Option<i64> = row.try_get("click_count").map_err(map_sqlx_error)?;

        Ok(LinkRecord {
            link_id: link_id.into(),
            original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
            email_id: row.try_get("email_id").map_err(map_sqlx_error)?,
            recipient_email: row.try_get("recipient_email").map_err(map_sqlx_error)?,
            created_at: parse_millis("created_at", created_at)?,
            click_count: parse_count("click_count", click_count)?,
            last_clicked: last_clicked
                .map(|value| parse_millis("last_clicked", value))
                .transpose()?,
            user_agent: row.try_get("user_agent").map_err(map_sqlx_error)?,
            ip_address: row.try_get("ip_address").map_err(map_sqlx_error)?,
        })
    }
}

/// SQLite implementation of the record store contract for one record kind.
///
/// Timestamps are stored as integer milliseconds since the Unix epoch.
/// Events are applied with a single `UPDATE ... RETURNING` statement, which
/// SQLite executes atomically, so concurrent events never lose an increment.
#[derive(Debug)]
pub struct SqliteStore<R> {
    pool: SqlitePool,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for SqliteStore<R> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<R> SqliteStore<R> {
    /// Creates a store from an existing pool, see [`connect`].
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SqliteStore<TrackingRecord> {
    /// Inserts a freshly issued tracking record.
    /// Returns `Err(Conflict)` if the identifier already exists.
    pub async fn insert(&self, record: &TrackingRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO email_tracking
                (tracking_id, recipient_email, subject, sent_at, opened_at,
                 open_count, user_agent, ip_address)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.tracking_id.as_str())
        .bind(&record.recipient_email)
        .bind(&record.subject)
        .bind(record.sent_at.as_millisecond())
        .bind(record.opened_at.map(|ts| ts.as_millisecond()))
        .bind(to_sql_count(record.open_count)?)
        .bind(record.user_agent.as_deref())
        .bind(record.ip_address.as_deref())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(record.tracking_id.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }
}

impl SqliteStore<LinkRecord> {
    /// Inserts a freshly issued link record.
    /// Returns `Err(Conflict)` if the identifier already exists.
    pub async fn insert(&self, record: &LinkRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO link_tracking
                (link_id, original_url, email_id, recipient_email, created_at,
                 click_count, last_clicked, user_agent, ip_address)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.link_id.as_str())
        .bind(&record.original_url)
        .bind(record.email_id.as_deref())
        .bind(&record.recipient_email)
        .bind(record.created_at.as_millisecond())
        .bind(to_sql_count(record.click_count)?)
        .bind(record.last_clicked.map(|ts| ts.as_millisecond()))
        .bind(record.user_agent.as_deref())
        .bind(record.ip_address.as_deref())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(record.link_id.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }
}

#[async_trait]
impl<R: SqliteRecord> RecordStore<R> for SqliteStore<R> {
    async fn get(&self, id: &R::Id) -> Result<Option<R>> {
        let row = sqlx::query(R::SELECT_ONE)
            .bind(id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(R::from_row).transpose()
    }

    async fn apply_event(&self, id: &R::Id, visit: &Visit) -> Result<Applied<R>> {
        let row = sqlx::query(R::APPLY_EVENT)
            .bind(visit.seen_at.as_millisecond())
            .bind(visit.user_agent.as_str())
            .bind(visit.ip_address.as_deref())
            .bind(id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            trace!(table = R::TABLE, id = %id, "no row to update");
            return Ok(Applied::NotFound);
        };

        let record = R::from_row(&row)?;
        trace!(table = R::TABLE, id = %id, count = record.event_count(), "event applied");
        Ok(Applied::Updated(record))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<R>> {
        let rows = sqlx::query(R::LIST_RECENT)
            .bind(to_sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(R::from_row).collect()
    }

    async fn list_for_recipient(&self, recipient: &str, limit: usize) -> Result<Vec<R>> {
        let rows = sqlx::query(R::LIST_FOR_RECIPIENT)
            .bind(recipient)
            .bind(to_sql_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(R::from_row).collect()
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(R::COUNT)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        parse_count("count", Some(count))
    }
}

fn parse_millis(column: &str, value: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(value).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{value}': {e}"))
    })
}

fn parse_count(column: &str, value: Option<i64>) -> Result<u64> {
    let value = value.unwrap_or(0);
    u64::try_from(value)
        .map_err(|_| StorageError::InvalidData(format!("negative {column}: {value}")))
}

fn to_sql_count(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| StorageError::InvalidData(format!("counter out of range: {value}")))
}

fn to_sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}
