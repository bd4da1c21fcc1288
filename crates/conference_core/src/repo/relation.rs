//! Talk relationship resolver.
//!
//! # Responsibility
//! - Load talks by id with their room either joined inline (eager) or left as
//!   a foreign key (lazy).
//! - Attach rooms to talks already in hand without reading the talk rows again.
//!
//! # Invariants
//! - Output follows the order of the requested ids.
//! - Each talk appears at most once, however many talks share a room and
//!   however often an id is requested.
//! - Timeslots are never joined; they stay references by id.

use crate::model::entity::{EntityId, Reference, Stored};
use crate::model::room::Room;
use crate::model::talk::Talk;
use crate::repo::entity_repo::EntityTable;
use crate::repo::RepoResult;
use rusqlite::{params_from_iter, Connection};
use std::collections::HashMap;

// Stays well under SQLite's bound-parameter limit.
const IDS_PER_QUERY: usize = 500;

/// How relationships are materialized on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// Referenced rows are joined and returned inline.
    #[default]
    Eager,
    /// Only foreign keys are returned.
    Lazy,
}

impl FetchMode {
    /// Maps the `eagerload` flag of list requests.
    pub fn from_eager_flag(eager: bool) -> Self {
        if eager {
            Self::Eager
        } else {
            Self::Lazy
        }
    }
}

/// Loads talks with their room relationship resolved per `FetchMode`.
pub struct TalkRelationResolver<'conn> {
    conn: &'conn Connection,
}

impl<'conn> TalkRelationResolver<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Returns the talks for `talk_ids` in request order; absent ids are skipped.
    pub fn resolve(&self, talk_ids: &[EntityId], mode: FetchMode) -> RepoResult<Vec<Stored<Talk>>> {
        let mut by_id = HashMap::with_capacity(talk_ids.len());
        for chunk in talk_ids.chunks(IDS_PER_QUERY) {
            self.load_chunk(chunk, mode, &mut by_id)?;
        }

        // `remove` keeps the first occurrence of a repeated id only.
        Ok(talk_ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Loads the room of every talk in `talks` and inlines it.
    ///
    /// Only `room` rows are read; talk fields are kept as given. A talk whose
    /// room row is gone keeps the bare id.
    pub fn attach_rooms(&self, talks: Vec<Stored<Talk>>) -> RepoResult<Vec<Stored<Talk>>> {
        let mut room_ids: Vec<EntityId> = talks
            .iter()
            .map(|stored| stored.value.room.id())
            .collect();
        room_ids.sort_unstable();
        room_ids.dedup();

        let mut rooms = HashMap::with_capacity(room_ids.len());
        for chunk in room_ids.chunks(IDS_PER_QUERY) {
            self.load_rooms(chunk, &mut rooms)?;
        }

        Ok(talks
            .into_iter()
            .map(|mut stored| {
                let room_id = stored.value.room.id();
                stored.value.room = match rooms.get(&room_id) {
                    Some(room) => Reference::Loaded(Stored::new(room_id, Room::clone(room))),
                    None => Reference::Id(room_id),
                };
                stored
            })
            .collect())
    }

    fn load_rooms(&self, ids: &[EntityId], out: &mut HashMap<EntityId, Room>) -> RepoResult<()> {
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, {} FROM {} WHERE id IN ({placeholders});",
            Room::COLUMNS.join(", "),
            Room::TABLE
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(ids.iter()))?;
        while let Some(row) = rows.next()? {
            out.insert(row.get("id")?, Room::from_row(row)?);
        }
        Ok(())
    }

    fn load_chunk(
        &self,
        ids: &[EntityId],
        mode: FetchMode,
        out: &mut HashMap<EntityId, Stored<Talk>>,
    ) -> RepoResult<()> {
        let placeholders = vec!["?"; ids.len()].join(", ");
        let talk_columns = Talk::COLUMNS
            .iter()
            .map(|column| format!("talk.{column} AS {column}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = match mode {
            FetchMode::Eager => format!(
                "SELECT talk.id AS id, {talk_columns},
                        room.id AS joined_room_id,
                        room.name AS joined_room_name,
                        room.capacity AS joined_room_capacity
                 FROM talk
                 LEFT JOIN room ON room.id = talk.room_id
                 WHERE talk.id IN ({placeholders});"
            ),
            FetchMode::Lazy => format!(
                "SELECT talk.id AS id, {talk_columns}
                 FROM talk
                 WHERE talk.id IN ({placeholders});"
            ),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(ids.iter()))?;
        while let Some(row) = rows.next()? {
            let id: EntityId = row.get("id")?;
            let mut talk = Talk::from_row(row)?;

            if mode == FetchMode::Eager {
                if let Some(room_id) = row.get::<_, Option<EntityId>>("joined_room_id")? {
                    let room = Room {
                        name: row.get("joined_room_name")?,
                        capacity: row.get("joined_room_capacity")?,
                    };
                    talk.room = Reference::Loaded(Stored::new(room_id, room));
                }
            }

            out.entry(id).or_insert_with(|| Stored::new(id, talk));
        }
        Ok(())
    }
}
