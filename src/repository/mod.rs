//! Storage seam. Handlers only see [`Repository`]; the in-memory backend is
//! what the service runs with today.

mod memory;

pub use memory::InMemoryRepository;

use thiserror::Error;

/// A record addressable by a numeric id.
pub trait Entity: Clone + Send + Sync + 'static {
    const NAME: &'static str;

    fn id(&self) -> u64;

    /// Called by the repository when a new row is inserted.
    fn assign_id(&mut self, id: u64);
}

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
}

pub trait Repository<T: Entity>: Send + Sync {
    fn fetch_by_id(&self, id: u64) -> Result<Option<T>, RepoError>;

    /// Rows matching `filter`, ordered by id.
    fn fetch_by_filter(&self, filter: &dyn Fn(&T) -> bool) -> Result<Vec<T>, RepoError>;

    /// Stores a new row under a fresh id and returns it.
    fn insert(&self, item: T) -> Result<T, RepoError>;

    /// Like [`Repository::insert`], but returns `None` and stores nothing when
    /// a row matching `conflict` already exists. The check and the insert are
    /// one atomic step.
    fn insert_unless(
        &self,
        conflict: &dyn Fn(&T) -> bool,
        item: T,
    ) -> Result<Option<T>, RepoError>;

    /// Replaces an existing row; fails with `NotFound` if the id is unknown.
    fn update(&self, item: T) -> Result<T, RepoError>;

    fn fetch_all(&self) -> Result<Vec<T>, RepoError> {
        self.fetch_by_filter(&|_: &T| true)
    }

    fn fetch_one(&self, filter: &dyn Fn(&T) -> bool) -> Result<Option<T>, RepoError> {
        Ok(self.fetch_by_filter(filter)?.into_iter().next())
    }

    fn count(&self, filter: &dyn Fn(&T) -> bool) -> Result<usize, RepoError> {
        Ok(self.fetch_by_filter(filter)?.len())
    }
}
