use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use super::{Entity, RepoError, Repository};

pub struct InMemoryRepository<T: Entity> {
    rows: RwLock<BTreeMap<u64, T>>,
    next_id: AtomicU64,
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Loads rows that already carry their ids (seed data).
    pub fn with_rows(rows: impl IntoIterator<Item = T>) -> Self {
        let rows: BTreeMap<u64, T> = rows.into_iter().map(|r| (r.id(), r)).collect();
        let next = rows.keys().next_back().map_or(1, |max| max + 1);
        Self {
            rows: RwLock::new(rows),
            next_id: AtomicU64::new(next),
        }
    }
}

impl<T: Entity> InMemoryRepository<T> {
    // caller holds the write lock
    fn store_new(&self, rows: &mut BTreeMap<u64, T>, mut item: T) -> T {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        item.assign_id(id);
        rows.insert(id, item.clone());
        item
    }
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    fn fetch_by_id(&self, id: u64) -> Result<Option<T>, RepoError> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.get(&id).cloned())
    }

    fn fetch_by_filter(&self, filter: &dyn Fn(&T) -> bool) -> Result<Vec<T>, RepoError> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.values().filter(|r| filter(r)).cloned().collect())
    }

    fn insert(&self, item: T) -> Result<T, RepoError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        Ok(self.store_new(&mut rows, item))
    }

    fn insert_unless(
        &self,
        conflict: &dyn Fn(&T) -> bool,
        item: T,
    ) -> Result<Option<T>, RepoError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        if rows.values().any(|r| conflict(r)) {
            return Ok(None);
        }
        Ok(Some(self.store_new(&mut rows, item)))
    }

    fn update(&self, item: T) -> Result<T, RepoError> {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        match rows.get_mut(&item.id()) {
            Some(row) => {
                *row = item.clone();
                Ok(item)
            }
            None => Err(RepoError::NotFound {
                entity: T::NAME,
                id: item.id(),
            }),
        }
    }
}
