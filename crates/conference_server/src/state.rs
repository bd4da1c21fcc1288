//! Shared handler state.
//!
//! # Responsibility
//! - Own the single SQLite connection and the per-entity read caches.
//! - Run store work on tokio's blocking pool.
//!
//! # Invariants
//! - One operation holds the connection for its whole duration.
//! - Caches outlive every repository built on top of them.

use crate::error::ApiError;
use conference_core::{
    CrudError, CrudResult, CrudService, EntityCache, EntityTable, PagingDefaults, Room,
    SqliteEntityRepository, Talk, Timeslot,
};
use rusqlite::Connection;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

/// Serialized access to the process-wide connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `op` against the connection on the blocking pool.
    pub async fn call<T, F>(&self, op: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            op(&guard)
        })
        .await
        .map_err(|err| ApiError::internal(format!("store task failed: {err}")))?
    }
}

/// Read-through caches, one per entity type.
pub struct EntityCaches {
    pub rooms: EntityCache<Room>,
    pub timeslots: EntityCache<Timeslot>,
    pub talks: EntityCache<Talk>,
}

impl EntityCaches {
    /// Caches bounded to `capacity` rows each.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            rooms: EntityCache::with_capacity(capacity),
            timeslots: EntityCache::with_capacity(capacity),
            talks: EntityCache::with_capacity(capacity),
        }
    }
}

/// An entity exposed as a REST resource family.
pub trait Resource: EntityTable {
    /// Collection path, e.g. `/api/rooms`.
    const PATH: &'static str;

    fn cache(caches: &EntityCaches) -> &EntityCache<Self>;
}

impl Resource for Room {
    const PATH: &'static str = "/api/rooms";

    fn cache(caches: &EntityCaches) -> &EntityCache<Self> {
        &caches.rooms
    }
}

impl Resource for Timeslot {
    const PATH: &'static str = "/api/timeslots";

    fn cache(caches: &EntityCaches) -> &EntityCache<Self> {
        &caches.timeslots
    }
}

impl Resource for Talk {
    const PATH: &'static str = "/api/talks";

    fn cache(caches: &EntityCaches) -> &EntityCache<Self> {
        &caches.talks
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub caches: Arc<EntityCaches>,
    pub paging: PagingDefaults,
}

impl AppState {
    pub fn new(conn: Connection, paging: PagingDefaults, cache_capacity: NonZeroUsize) -> Self {
        Self {
            db: Database::new(conn),
            caches: Arc::new(EntityCaches::with_capacity(cache_capacity)),
            paging,
        }
    }

    /// Runs one CRUD use-case for `E` on the blocking pool.
    pub async fn run<E, T, F>(&self, op: F) -> Result<T, ApiError>
    where
        E: Resource,
        T: Send + 'static,
        F: FnOnce(&CrudService<E, SqliteEntityRepository<'_, E>>) -> CrudResult<T>
            + Send
            + 'static,
    {
        let caches = Arc::clone(&self.caches);
        self.db
            .call(move |conn| {
                let repo = SqliteEntityRepository::try_new(conn, E::cache(&caches))
                    .map_err(CrudError::from)?;
                Ok(op(&CrudService::new(repo))?)
            })
            .await
    }
}
