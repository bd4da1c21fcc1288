//! Table descriptors for room, timeslot and talk.

use crate::model::entity::{EntityId, Reference, Stored};
use crate::model::room::Room;
use crate::model::talk::Talk;
use crate::model::timeslot::Timeslot;
use crate::repo::entity_repo::EntityTable;
use crate::repo::relation::{FetchMode, TalkRelationResolver};
use crate::repo::{RepoError, RepoResult};
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};

impl EntityTable for Room {
    const TABLE: &'static str = "room";
    const COLUMNS: &'static [&'static str] = &["name", "capacity"];
    const SORTABLE: &'static [(&'static str, &'static str)] =
        &[("id", "id"), ("name", "name"), ("capacity", "capacity")];

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            self.capacity.map_or(Value::Null, |capacity| {
                Value::Integer(i64::from(capacity))
            }),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            name: row.get("name")?,
            capacity: row.get("capacity")?,
        })
    }
}

impl EntityTable for Timeslot {
    const TABLE: &'static str = "timeslot";
    const COLUMNS: &'static [&'static str] = &["start_at", "end_at"];
    const SORTABLE: &'static [(&'static str, &'static str)] =
        &[("id", "id"), ("start", "start_at"), ("end", "end_at")];

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.start.timestamp_millis()),
            Value::Integer(self.end.timestamp_millis()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            start: instant_from_millis(row.get("start_at")?, "timeslot.start_at")?,
            end: instant_from_millis(row.get("end_at")?, "timeslot.end_at")?,
        })
    }

    // Rows keep epoch milliseconds.
    fn stored_form(&self) -> Self {
        Self {
            start: self.start.trunc_subsecs(3),
            end: self.end.trunc_subsecs(3),
        }
    }
}

impl EntityTable for Talk {
    const TABLE: &'static str = "talk";
    const COLUMNS: &'static [&'static str] = &[
        "title",
        "speaker",
        "abstract_text",
        "room_id",
        "timeslot_id",
    ];
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("id", "id"),
        ("title", "title"),
        ("speaker", "speaker"),
        ("abstractText", "abstract_text"),
    ];

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            Value::Text(self.speaker.clone()),
            Value::Text(self.abstract_text.clone()),
            Value::Integer(self.room.id()),
            Value::Integer(self.timeslot.id()),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            title: row.get("title")?,
            speaker: row.get("speaker")?,
            abstract_text: row.get("abstract_text")?,
            room: Reference::Id(row.get::<_, EntityId>("room_id")?),
            timeslot: Reference::Id(row.get::<_, EntityId>("timeslot_id")?),
        })
    }

    // Rows hold foreign keys only.
    fn stored_form(&self) -> Self {
        Self {
            room: self.room.clone().into_id(),
            timeslot: self.timeslot.clone().into_id(),
            ..self.clone()
        }
    }

    fn resolve_relations(
        conn: &Connection,
        items: Vec<Stored<Self>>,
        mode: FetchMode,
    ) -> RepoResult<Vec<Stored<Self>>> {
        match mode {
            FetchMode::Lazy => Ok(items
                .into_iter()
                .map(|mut stored| {
                    stored.value.room = stored.value.room.into_id();
                    stored.value.timeslot = stored.value.timeslot.into_id();
                    stored
                })
                .collect()),
            FetchMode::Eager => TalkRelationResolver::new(conn).attach_rooms(items),
        }
    }
}

fn instant_from_millis(millis: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        RepoError::InvalidData(format!("instant `{millis}` out of range in {column}"))
    })
}
