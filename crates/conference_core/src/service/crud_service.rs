//! Generic CRUD orchestrator.
//!
//! # Responsibility
//! - Provide create/replace/partial-update/get/list/delete for any entity.
//! - Reject requests with bad identity before any store write.
//!
//! # Invariants
//! - Create never accepts a client-supplied id.
//! - Replace and partial update require body id == path id and an existing row.
//! - Id checks run in order `idnull`, `idinvalid`, `idnotfound`; only the last
//!   one consults the store.
//! - Delete succeeds whether or not the row existed.

use crate::model::entity::{Entity, EntityId, Payload, Stored, ValidationError};
use crate::paging::{Page, PageRequest, PageRequestError, PagingDefaults};
use crate::repo::entity_repo::{EntityRepository, EntityTable};
use crate::repo::relation::FetchMode;
use crate::repo::RepoError;
use crate::service::merge::apply_patch;
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type CrudResult<T> = Result<T, CrudError>;

/// Client-error reasons for identity checks, reported as machine-readable keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadRequestReason {
    /// Create body already carries an id.
    IdExists,
    /// Update body carries no id.
    IdNull,
    /// Update body id differs from the path id.
    IdInvalid,
    /// Update targets a row that does not exist.
    IdNotFound,
}

impl BadRequestReason {
    pub fn key(self) -> &'static str {
        match self {
            Self::IdExists => "idexists",
            Self::IdNull => "idnull",
            Self::IdInvalid => "idinvalid",
            Self::IdNotFound => "idnotfound",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::IdExists => "A new entity cannot already have an ID",
            Self::IdNull => "Invalid id",
            Self::IdInvalid => "Invalid ID",
            Self::IdNotFound => "Entity not found",
        }
    }
}

/// Service error for CRUD use-cases.
#[derive(Debug)]
pub enum CrudError {
    BadRequest {
        entity: &'static str,
        reason: BadRequestReason,
    },
    Validation(ValidationError),
    InvalidSort {
        entity: &'static str,
        error: PageRequestError,
    },
    Repo(RepoError),
}

impl CrudError {
    fn bad_request<E: Entity>(reason: BadRequestReason) -> Self {
        info!(
            "event=request_rejected module=service status=error entity={} reason={}",
            E::NAME,
            reason.key()
        );
        Self::BadRequest {
            entity: E::NAME,
            reason,
        }
    }

    /// Returns the identity-check reason, if this is one.
    pub fn reason(&self) -> Option<BadRequestReason> {
        match self {
            Self::BadRequest { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl Display for CrudError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { entity, reason } => {
                write!(f, "{}: {entity} ({})", reason.title(), reason.key())
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidSort { entity, error } => write!(f, "{entity}: {error}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CrudError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidSort { error, .. } => Some(error),
            Self::Repo(err) => Some(err),
            Self::BadRequest { .. } => None,
        }
    }
}

impl From<ValidationError> for CrudError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CrudError {
    fn from(value: RepoError) -> Self {
        match value {
            // The row vanished between the existence check and the write.
            RepoError::NotFound { entity, .. } => Self::BadRequest {
                entity,
                reason: BadRequestReason::IdNotFound,
            },
            other => Self::Repo(other),
        }
    }
}

/// Parses list query pairs against the sortable fields of `E`.
pub fn page_request_for<E: EntityTable>(
    pairs: &[(String, String)],
    defaults: PagingDefaults,
) -> CrudResult<PageRequest> {
    PageRequest::from_query_pairs(pairs, &E::sortable_fields(), defaults).map_err(|error| {
        CrudError::InvalidSort {
            entity: E::NAME,
            error,
        }
    })
}

/// Use-case service wrapping one entity repository.
pub struct CrudService<E, R> {
    repo: R,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, R: EntityRepository<E>> CrudService<E, R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            _entity: PhantomData,
        }
    }

    /// Persists a new entity and returns it with its assigned id.
    ///
    /// # Errors
    /// - `Validation` when a required field is missing.
    /// - `BadRequest(IdExists)` when the body carries an id.
    pub fn create(&self, payload: Payload<E::Patch>) -> CrudResult<Stored<E>> {
        debug!(
            "event=entity_create module=service status=start entity={}",
            E::NAME
        );
        let draft = E::from_patch(payload.fields)?;
        if payload.id.is_some() {
            return Err(CrudError::bad_request::<E>(BadRequestReason::IdExists));
        }

        let stored = self.repo.create(&draft)?;
        debug!(
            "event=entity_create module=service status=ok entity={} id={}",
            E::NAME,
            stored.id
        );
        Ok(stored)
    }

    /// Overwrites every field of an existing entity with the body.
    pub fn replace(&self, id: EntityId, payload: Payload<E::Patch>) -> CrudResult<Stored<E>> {
        debug!(
            "event=entity_replace module=service status=start entity={} id={}",
            E::NAME,
            id
        );
        let draft = E::from_patch(payload.fields)?;
        self.check_update_target(id, payload.id)?;

        Ok(self.repo.replace(&Stored::new(id, draft))?)
    }

    /// Overwrites only the non-null fields present in the body.
    pub fn partial_update(
        &self,
        id: EntityId,
        payload: Payload<E::Patch>,
    ) -> CrudResult<Stored<E>> {
        debug!(
            "event=entity_patch module=service status=start entity={} id={}",
            E::NAME,
            id
        );
        self.check_update_target(id, payload.id)?;

        let existing = self
            .repo
            .get(id)?
            .ok_or_else(|| CrudError::bad_request::<E>(BadRequestReason::IdNotFound))?;
        let merged = apply_patch(payload.fields, existing);
        Ok(self.repo.replace(&merged)?)
    }

    /// Reads one entity with its relationships loaded eagerly.
    pub fn get(&self, id: EntityId) -> CrudResult<Option<Stored<E>>> {
        let Some(stored) = self.repo.get(id)? else {
            return Ok(None);
        };
        Ok(self
            .repo
            .resolve(vec![stored], FetchMode::Eager)?
            .into_iter()
            .next())
    }

    /// Reads one page of entities with relationships loaded per `mode`.
    pub fn list(&self, request: &PageRequest, mode: FetchMode) -> CrudResult<Page<Stored<E>>> {
        debug!(
            "event=entity_list module=service status=start entity={} page={} size={} mode={:?}",
            E::NAME,
            request.page,
            request.size,
            mode
        );
        let Page {
            content,
            number,
            size,
            total_elements,
        } = self.repo.list_page(request)?;

        Ok(Page {
            content: self.repo.resolve(content, mode)?,
            number,
            size,
            total_elements,
        })
    }

    /// Removes an entity; deleting an absent id is not an error.
    pub fn delete(&self, id: EntityId) -> CrudResult<()> {
        debug!(
            "event=entity_delete module=service status=start entity={} id={}",
            E::NAME,
            id
        );
        self.repo.delete(id)?;
        Ok(())
    }

    fn check_update_target(&self, path_id: EntityId, body_id: Option<EntityId>) -> CrudResult<()> {
        let Some(body_id) = body_id else {
            return Err(CrudError::bad_request::<E>(BadRequestReason::IdNull));
        };
        if body_id != path_id {
            return Err(CrudError::bad_request::<E>(BadRequestReason::IdInvalid));
        }
        if !self.repo.exists(path_id)? {
            return Err(CrudError::bad_request::<E>(BadRequestReason::IdNotFound));
        }
        Ok(())
    }
}
