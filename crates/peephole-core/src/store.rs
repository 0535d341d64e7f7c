use crate::error::Result;
use crate::record::{Record, Visit};
use async_trait::async_trait;

/// Outcome of applying an event to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied<R> {
    /// The record existed and now reflects the event.
    Updated(R),
    /// No record matches the identifier; nothing was written.
    NotFound,
}

impl<R> Applied<R> {
    pub fn updated(self) -> Option<R> {
        match self {
            Applied::Updated(record) => Some(record),
            Applied::NotFound => None,
        }
    }
}

/// A key-indexed table of records of one kind.
///
/// Records are created by the issuing side before any event references them;
/// the tracking pipelines only read and update existing rows.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync + 'static {
    /// Retrieves the record for a given identifier.
    /// Returns `None` if the identifier is unknown.
    async fn get(&self, id: &R::Id) -> Result<Option<R>>;

    /// Applies one event to the record with the given identifier.
    ///
    /// The counter increment and last-seen overwrite happen as one atomic unit
    /// per identifier: concurrent events for the same record are each counted
    /// exactly once. An unknown identifier yields [`Applied::NotFound`] and
    /// leaves the store untouched.
    async fn apply_event(&self, id: &R::Id, visit: &Visit) -> Result<Applied<R>>;

    /// Lists at most `limit` records, most recent first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<R>>;

    /// Lists at most `limit` records addressed to `recipient`, most recent first.
    async fn list_for_recipient(&self, recipient: &str, limit: usize) -> Result<Vec<R>>;

    /// Number of stored records.
    async fn count(&self) -> Result<u64>;
}
