//! Partial-update merger.
//!
//! # Invariants
//! - Identity comes from the persisted row; a patch cannot carry or change it.
//! - A null or absent patch field keeps the persisted value.
//! - Merging the same patch twice yields the same state as merging it once.

use crate::model::entity::{Entity, Stored};

/// Applies `patch` on top of `existing`, keeping the existing identity.
pub fn apply_patch<E: Entity>(patch: E::Patch, existing: Stored<E>) -> Stored<E> {
    let Stored { id, value } = existing;
    Stored::new(id, E::merge(patch, value))
}
