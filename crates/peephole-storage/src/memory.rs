use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use peephole_core::{Applied, Record, RecordStore, Result, StorageError, Visit};
use std::sync::Arc;
use tracing::trace;

/// In-memory implementation of [`RecordStore`] using DashMap.
///
/// Events are applied while holding the shard write guard of the record, so
/// concurrent events for one identifier serialize while events for other
/// identifiers proceed in parallel. Clones share the same map.
#[derive(Debug, Clone)]
pub struct InMemoryStore<R> {
    storage: Arc<DashMap<String, R>>,
}

impl<R: Record> InMemoryStore<R> {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(DashMap::new()),
        }
    }

    /// Inserts a freshly issued record.
    /// Returns `Err(Conflict)` if the identifier is already taken.
    pub fn insert(&self, record: R) -> Result<()> {
        match self.storage.entry(record.id().as_ref().to_owned()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(record.id().to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn sorted(&self, mut records: Vec<R>, limit: usize) -> Vec<R> {
        records.sort_by(R::recency_cmp);
        records.truncate(limit);
        records
    }
}

impl<R: Record> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for InMemoryStore<R> {
    async fn get(&self, id: &R::Id) -> Result<Option<R>> {
        Ok(self.storage.get(id.as_ref()).map(|entry| entry.value().clone()))
    }

    async fn apply_event(&self, id: &R::Id, visit: &Visit) -> Result<Applied<R>> {
        let Some(mut entry) = self.storage.get_mut(id.as_ref()) else {
            trace!(kind = R::KIND, id = %id, "no record to update");
            return Ok(Applied::NotFound);
        };

        entry.apply_visit(visit);
        trace!(kind = R::KIND, id = %id, count = entry.event_count(), "event applied");
        Ok(Applied::Updated(entry.value().clone()))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<R>> {
        let records = self
            .storage
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        Ok(self.sorted(records, limit))
    }

    async fn list_for_recipient(&self, recipient: &str, limit: usize) -> Result<Vec<R>> {
        let records = self
            .storage
            .iter()
            .filter(|entry| entry.value().recipient() == recipient)
            .map(|entry| entry.value().clone())
            .collect();
        Ok(self.sorted(records, limit))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.storage.len() as u64)
    }
}
