//! Generic entity store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/get/replace/delete/list over one table per entity type.
//! - Keep the per-type SQL shape in an `EntityTable` descriptor.
//! - Serve single-row reads through the entity's `EntityCache`.
//!
//! # Invariants
//! - Ids come from SQLite `AUTOINCREMENT` and are never reused.
//! - Each write runs in its own transaction.
//! - A read after a write on the same repository observes the write.

use crate::model::entity::{Entity, EntityId, Stored};
use crate::paging::{Page, PageRequest};
use crate::repo::cache::EntityCache;
use crate::repo::relation::FetchMode;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

/// SQL mapping for an entity type.
pub trait EntityTable: Entity {
    /// Table holding one row per entity.
    const TABLE: &'static str;
    /// Data columns, excluding `id`, in the order `to_row` binds them.
    const COLUMNS: &'static [&'static str];
    /// `(wire field, column)` pairs accepted as sort keys.
    const SORTABLE: &'static [(&'static str, &'static str)];

    /// Column values in `COLUMNS` order.
    fn to_row(&self) -> Vec<Value>;

    /// Reads the entity from a row selected with `COLUMNS` (by name).
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    /// The value as `from_row` would read it back after `to_row` stored it.
    ///
    /// Writes cache and return this form, so a cached read never differs
    /// from a read that goes to the row.
    fn stored_form(&self) -> Self {
        self.clone()
    }

    /// Materializes relationships of `items` according to `mode`.
    ///
    /// Entities without relationships return `items` unchanged.
    fn resolve_relations(
        _conn: &Connection,
        items: Vec<Stored<Self>>,
        _mode: FetchMode,
    ) -> RepoResult<Vec<Stored<Self>>> {
        Ok(items)
    }

    fn sortable_fields() -> Vec<&'static str> {
        Self::SORTABLE.iter().map(|(field, _)| *field).collect()
    }

    fn sort_column(field: &str) -> Option<&'static str> {
        Self::SORTABLE
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, column)| *column)
    }
}

/// Store contract the CRUD orchestrator delegates to.
pub trait EntityRepository<E: Entity> {
    /// Inserts `draft` and returns it with its assigned id.
    fn create(&self, draft: &E) -> RepoResult<Stored<E>>;
    fn get(&self, id: EntityId) -> RepoResult<Option<Stored<E>>>;
    fn exists(&self, id: EntityId) -> RepoResult<bool>;
    /// Overwrites every column of an existing row.
    ///
    /// Returns `RepoError::NotFound` when the row does not exist.
    fn replace(&self, entity: &Stored<E>) -> RepoResult<Stored<E>>;
    /// Removes the row; removing an absent id is a no-op.
    fn delete(&self, id: EntityId) -> RepoResult<()>;
    fn list_page(&self, request: &PageRequest) -> RepoResult<Page<Stored<E>>>;
    fn resolve(&self, items: Vec<Stored<E>>, mode: FetchMode) -> RepoResult<Vec<Stored<E>>>;
}

/// SQLite-backed entity repository.
pub struct SqliteEntityRepository<'a, E> {
    conn: &'a Connection,
    cache: &'a EntityCache<E>,
}

impl<'a, E: EntityTable> SqliteEntityRepository<'a, E> {
    /// Constructs a repository from a migrated connection and the entity cache.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations were not applied.
    /// - `MissingRequiredTable` when the entity table is absent.
    pub fn try_new(conn: &'a Connection, cache: &'a EntityCache<E>) -> RepoResult<Self> {
        ensure_connection_ready(conn, E::TABLE)?;
        Ok(Self { conn, cache })
    }

    fn select_sql() -> String {
        format!("SELECT id, {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
    }

    fn parse_row(row: &Row<'_>) -> RepoResult<Stored<E>> {
        Ok(Stored::new(row.get("id")?, E::from_row(row)?))
    }

    fn load(&self, id: EntityId) -> RepoResult<Option<Stored<E>>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE id = ?1;", Self::select_sql()))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::parse_row(row)?)),
            None => Ok(None),
        }
    }
}

impl<E: EntityTable> EntityRepository<E> for SqliteEntityRepository<'_, E> {
    fn create(&self, draft: &E) -> RepoResult<Stored<E>> {
        let placeholders = (1..=E::COLUMNS.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            E::TABLE,
            E::COLUMNS.join(", ")
        );

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&sql, params_from_iter(draft.to_row()))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        let stored = Stored::new(id, draft.stored_form());
        self.cache.put(&stored);
        debug!(
            "event=row_insert module=repo status=ok table={} id={}",
            E::TABLE,
            id
        );
        Ok(stored)
    }

    fn get(&self, id: EntityId) -> RepoResult<Option<Stored<E>>> {
        if let Some(cached) = self.cache.get(id) {
            return Ok(Some(cached));
        }

        let loaded = self.load(id)?;
        if let Some(stored) = &loaded {
            self.cache.put(stored);
        }
        Ok(loaded)
    }

    fn exists(&self, id: EntityId) -> RepoResult<bool> {
        if self.cache.contains(id) {
            return Ok(true);
        }
        let found = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1;", E::TABLE),
                [id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn replace(&self, entity: &Stored<E>) -> RepoResult<Stored<E>> {
        let assignments = E::COLUMNS
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE id = ?{};",
            E::TABLE,
            E::COLUMNS.len() + 1
        );
        let mut values = entity.value.to_row();
        values.push(Value::Integer(entity.id));

        self.cache.evict(entity.id);
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: E::NAME,
                id: entity.id,
            });
        }
        tx.commit()?;

        let stored = Stored::new(entity.id, entity.value.stored_form());
        self.cache.put(&stored);
        debug!(
            "event=row_update module=repo status=ok table={} id={}",
            E::TABLE,
            entity.id
        );
        Ok(stored)
    }

    fn delete(&self, id: EntityId) -> RepoResult<()> {
        self.cache.evict(id);
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(&format!("DELETE FROM {} WHERE id = ?1;", E::TABLE), [id])?;
        tx.commit()?;

        debug!(
            "event=row_delete module=repo status=ok table={} id={} removed={}",
            E::TABLE,
            id,
            changed
        );
        Ok(())
    }

    fn list_page(&self, request: &PageRequest) -> RepoResult<Page<Stored<E>>> {
        let mut order_by = Vec::with_capacity(request.sort.len());
        for order in &request.sort {
            let column = E::sort_column(&order.field).ok_or_else(|| {
                RepoError::InvalidQuery(format!(
                    "`{}` is not a sortable {} field",
                    order.field,
                    E::NAME
                ))
            })?;
            order_by.push(format!("{column} {}", order.direction.as_sql()));
        }

        let limit = i64::from(request.size);
        let offset = i64::try_from(request.offset()).map_err(|_| {
            RepoError::InvalidQuery(format!("page {} is out of range", request.page))
        })?;

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", E::TABLE),
            [],
            |row| row.get(0),
        )?;

        let mut sql = Self::select_sql();
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order_by.join(", "));
        }
        sql.push_str(" LIMIT ?1 OFFSET ?2;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([limit, offset])?;
        let mut content = Vec::new();
        while let Some(row) = rows.next()? {
            content.push(Self::parse_row(row)?);
        }

        let total = u64::try_from(total)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {total}")))?;
        Ok(Page::new(content, request, total))
    }

    fn resolve(&self, items: Vec<Stored<E>>, mode: FetchMode) -> RepoResult<Vec<Stored<E>>> {
        E::resolve_relations(self.conn, items, mode)
    }
}
