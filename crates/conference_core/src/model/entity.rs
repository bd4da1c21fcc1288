//! Identity, references and the entity descriptor shared by every record type.
//!
//! # Responsibility
//! - Separate identity (`Stored`) from field values (the entity draft).
//! - Describe the capabilities a record type needs to plug into generic CRUD.
//!
//! # Invariants
//! - A draft has no id; only the store turns a draft into a `Stored` value.
//! - `Stored` equality and hashing use the id alone.
//! - A `Reference` serializes as the full target when loaded, else as `{"id":N}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Store-assigned row identifier.
pub type EntityId = i64;

/// Capability set a record type provides to the generic CRUD pipeline.
///
/// The implementing type is the draft: every mutable field, no id.
pub trait Entity:
    Debug + Clone + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Lowercase name reported in error payloads (`room`, `talk`, ...).
    const NAME: &'static str;

    /// Same fields as the draft, each optional. Used for request bodies and
    /// partial updates.
    type Patch: Debug + Default + Clone + Send + DeserializeOwned + 'static;

    /// Builds a draft from a fully populated patch.
    ///
    /// # Errors
    /// - Returns every required field that is absent or null.
    fn from_patch(patch: Self::Patch) -> Result<Self, ValidationError>;

    /// Overrides fields of `existing` with every non-null patch field.
    ///
    /// A null patch field never clears the existing value.
    fn merge(patch: Self::Patch, existing: Self) -> Self;
}

/// A record that has been persisted and carries its identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stored<E> {
    pub id: EntityId,
    #[serde(flatten)]
    pub value: E,
}

impl<E> Stored<E> {
    pub fn new(id: EntityId, value: E) -> Self {
        Self { id, value }
    }
}

impl<E> PartialEq for Stored<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<E> Eq for Stored<E> {}

impl<E> Hash for Stored<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// To-one relationship from one entity to another.
///
/// Equality compares the target id only, whichever variant is held.
#[derive(Debug, Clone)]
pub enum Reference<E> {
    /// Only the foreign key is known.
    Id(EntityId),
    /// The target row was materialized alongside the owner.
    Loaded(Stored<E>),
}

impl<E> Reference<E> {
    pub fn id(&self) -> EntityId {
        match self {
            Self::Id(id) => *id,
            Self::Loaded(stored) => stored.id,
        }
    }

    pub fn loaded(&self) -> Option<&Stored<E>> {
        match self {
            Self::Id(_) => None,
            Self::Loaded(stored) => Some(stored),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Drops any materialized target, keeping the foreign key.
    pub fn into_id(self) -> Self {
        Self::Id(self.id())
    }
}

impl<E> PartialEq for Reference<E> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<E> Eq for Reference<E> {}

#[derive(Serialize, Deserialize)]
struct IdOnly {
    id: EntityId,
}

impl<E: Serialize> Serialize for Reference<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Id(id) => IdOnly { id: *id }.serialize(serializer),
            Self::Loaded(stored) => stored.serialize(serializer),
        }
    }
}

// Incoming references are resolved by id; any other fields are ignored.
impl<'de, E> Deserialize<'de> for Reference<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IdOnly::deserialize(deserializer).map(|raw| Self::Id(raw.id))
    }
}

/// Request body shape: optional client-sent id plus the entity patch fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Payload<P> {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(flatten)]
    pub fields: P,
}

/// Required fields missing from a create or full-replace body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub entity: &'static str,
    pub missing_fields: Vec<&'static str>,
}

impl ValidationError {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            missing_fields: Vec::new(),
        }
    }

    /// Records `field` when `value` is absent.
    pub fn require<T>(&mut self, field: &'static str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.missing_fields.push(field);
        }
        value
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} is missing required fields: {}",
            self.entity,
            self.missing_fields.join(", ")
        )
    }
}

impl Error for ValidationError {}
