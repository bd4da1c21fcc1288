//! Core domain logic for the conference scheduling backend.
//! This crate owns the entity model, the SQLite store and the CRUD rules;
//! transport adapters only translate to and from it.

pub mod db;
pub mod logging;
pub mod model;
pub mod paging;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::entity::{Entity, EntityId, Payload, Reference, Stored, ValidationError};
pub use model::room::{Room, RoomPatch};
pub use model::talk::{Talk, TalkPatch};
pub use model::timeslot::{Timeslot, TimeslotPatch};
pub use paging::{
    pagination_headers, Direction, Page, PageRequest, PageRequestError, PaginationHeaders,
    PagingDefaults, SortOrder,
};
pub use repo::cache::{CacheStats, EntityCache, DEFAULT_CACHE_CAPACITY};
pub use repo::entity_repo::{EntityRepository, EntityTable, SqliteEntityRepository};
pub use repo::relation::{FetchMode, TalkRelationResolver};
pub use repo::{RepoError, RepoResult};
pub use service::crud_service::{
    page_request_for, BadRequestReason, CrudError, CrudResult, CrudService,
};
pub use service::merge::apply_patch;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
