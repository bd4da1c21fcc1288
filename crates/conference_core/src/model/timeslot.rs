//! Timeslot domain model.
//!
//! # Invariants
//! - `start` and `end` are always present on a persisted timeslot.
//! - No ordering between `start` and `end` is enforced.
//! - Instants are stored with millisecond precision.

use super::entity::{Entity, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A time window talks can be scheduled into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeslot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Timeslot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Optional-field view of [`Timeslot`] used by request bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeslotPatch {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Entity for Timeslot {
    const NAME: &'static str = "timeslot";
    type Patch = TimeslotPatch;

    fn from_patch(patch: TimeslotPatch) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new(Self::NAME);
        let start = errors.require("start", patch.start);
        let end = errors.require("end", patch.end);
        match (start, end) {
            (Some(start), Some(end)) => Ok(Self { start, end }),
            _ => Err(errors),
        }
    }

    fn merge(patch: TimeslotPatch, existing: Self) -> Self {
        Self {
            start: patch.start.unwrap_or(existing.start),
            end: patch.end.unwrap_or(existing.end),
        }
    }
}
