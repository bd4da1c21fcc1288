//! Room domain model.
//!
//! # Invariants
//! - `name` is always present on a persisted room.
//! - `capacity` is optional and unconstrained.

use super::entity::{Entity, ValidationError};
use serde::{Deserialize, Serialize};

/// A venue talks can be held in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    #[serde(default)]
    pub capacity: Option<i32>,
}

impl Room {
    pub fn new(name: impl Into<String>, capacity: Option<i32>) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }
}

/// Optional-field view of [`Room`] used by request bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomPatch {
    pub name: Option<String>,
    pub capacity: Option<i32>,
}

impl Entity for Room {
    const NAME: &'static str = "room";
    type Patch = RoomPatch;

    fn from_patch(patch: RoomPatch) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new(Self::NAME);
        match errors.require("name", patch.name) {
            Some(name) => Ok(Self {
                name,
                capacity: patch.capacity,
            }),
            None => Err(errors),
        }
    }

    fn merge(patch: RoomPatch, existing: Self) -> Self {
        Self {
            name: patch.name.unwrap_or(existing.name),
            capacity: patch.capacity.or(existing.capacity),
        }
    }
}
