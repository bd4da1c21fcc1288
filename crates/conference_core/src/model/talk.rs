//! Talk domain model.
//!
//! # Responsibility
//! - Hold the scheduled talk record and its to-one references.
//!
//! # Invariants
//! - A talk always references exactly one room and one timeslot.
//! - References are plain foreign keys unless a read materialized them.
//! - No rule prevents two talks sharing a room and timeslot.

use super::entity::{Entity, Reference, ValidationError};
use super::room::Room;
use super::timeslot::Timeslot;
use serde::{Deserialize, Serialize};

/// A talk given by one speaker, placed in a room during a timeslot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Talk {
    pub title: String,
    pub speaker: String,
    pub abstract_text: String,
    pub room: Reference<Room>,
    pub timeslot: Reference<Timeslot>,
}

/// Optional-field view of [`Talk`] used by request bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TalkPatch {
    pub title: Option<String>,
    pub speaker: Option<String>,
    pub abstract_text: Option<String>,
    pub room: Option<Reference<Room>>,
    pub timeslot: Option<Reference<Timeslot>>,
}

impl Entity for Talk {
    const NAME: &'static str = "talk";
    type Patch = TalkPatch;

    fn from_patch(patch: TalkPatch) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new(Self::NAME);
        let title = errors.require("title", patch.title);
        let speaker = errors.require("speaker", patch.speaker);
        let abstract_text = errors.require("abstractText", patch.abstract_text);
        let room = errors.require("room", patch.room);
        let timeslot = errors.require("timeslot", patch.timeslot);

        match (title, speaker, abstract_text, room, timeslot) {
            (Some(title), Some(speaker), Some(abstract_text), Some(room), Some(timeslot)) => {
                Ok(Self {
                    title,
                    speaker,
                    abstract_text,
                    room,
                    timeslot,
                })
            }
            _ => Err(errors),
        }
    }

    fn merge(patch: TalkPatch, existing: Self) -> Self {
        Self {
            title: patch.title.unwrap_or(existing.title),
            speaker: patch.speaker.unwrap_or(existing.speaker),
            abstract_text: patch.abstract_text.unwrap_or(existing.abstract_text),
            room: patch.room.unwrap_or(existing.room),
            timeslot: patch.timeslot.unwrap_or(existing.timeslot),
        }
    }
}
