mod dataset_requests;
mod entries;
mod objectives;
mod processings;
mod profile;
mod projects;
mod trainings;
mod users;

pub use objectives::list_for_project_id as list_objectives_for_project;
pub use projects::{find_by_name as find_project_by_name, rename as rename_project};
pub use users::find_by_email as find_user_by_email;

use crate::errors::{AppError, AppResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Tables that reference a project by its name.
pub const PROJECT_SCOPED_TABLES: [&str; 4] =
    ["data_entries", "data_processings", "model_trainings", "dataset_requests"];

/// Whether a refresher still has someone to publish to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Live,
    Dropped,
}

/// Called with the live connection after a committed write touched a table.
/// Refreshers that report [`ObserverState::Dropped`] are unregistered.
pub type Refresher = Arc<dyn Fn(&Connection) -> AppResult<ObserverState> + Send + Sync>;

/// A table-backed entity.
///
/// Implementors supply the row mapping and the two write statements; reads
/// and deletes are shared.
pub trait StoredEntity: Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str = "id";
    /// Column list in the order `from_row` reads it.
    const COLUMNS: &'static str;
    /// Tables whose rows go away through `ON DELETE CASCADE` when a row here is deleted.
    const CASCADES_TO: &'static [&'static str] = &[];

    fn key(&self) -> Option<i64>;

    fn validate(&self) -> AppResult<()> {
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Insert, or overwrite every column when the key already exists.
    fn upsert(conn: &Connection, entity: &Self) -> AppResult<i64>;

    /// Overwrite an existing row; `AppError::NotFound` when the key is unknown.
    fn update(conn: &Connection, entity: &Self) -> AppResult<()>;

    fn get(conn: &Connection, id: i64) -> AppResult<Option<Self>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            Self::COLUMNS,
            Self::TABLE,
            Self::KEY_COLUMN
        );
        conn.query_row(&sql, [id], Self::from_row)
            .optional()
            .map_err(AppError::from)
    }

    fn list(conn: &Connection) -> AppResult<Vec<Self>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {} ASC",
            Self::COLUMNS,
            Self::TABLE,
            Self::KEY_COLUMN
        );
        let mut statement = conn.prepare(&sql)?;
        let rows = statement
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn delete(conn: &Connection, id: i64) -> AppResult<bool> {
        let sql = format!("DELETE FROM {} WHERE {} = ?1", Self::TABLE, Self::KEY_COLUMN);
        let removed = conn.execute(&sql, [id])?;
        Ok(removed > 0)
    }
}

/// Entities attached to a project through its name.
pub trait ProjectScoped: StoredEntity {
    const CREATED_COLUMN: &'static str;

    fn project_name(&self) -> &str;

    /// Most recently created row for `project_name`; ties fall back to the higher id.
    fn latest_for_project(conn: &Connection, project_name: &str) -> AppResult<Option<Self>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE project_name = ?1 ORDER BY {} DESC, {} DESC LIMIT 1",
            Self::COLUMNS,
            Self::TABLE,
            Self::CREATED_COLUMN,
            Self::KEY_COLUMN
        );
        conn.query_row(&sql, [project_name], Self::from_row)
            .optional()
            .map_err(AppError::from)
    }

    fn list_for_project(conn: &Connection, project_name: &str) -> AppResult<Vec<Self>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE project_name = ?1 ORDER BY {} DESC, {} DESC",
            Self::COLUMNS,
            Self::TABLE,
            Self::CREATED_COLUMN,
            Self::KEY_COLUMN
        );
        let mut statement = conn.prepare(&sql)?;
        let rows = statement
            .query_map([project_name], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Rows mirrored from the backend. `remote_id` is the backend's id and is
/// unique per table; the local `id` stays under local control.
pub trait RemoteMirrored: StoredEntity {
    fn remote_id(&self) -> Option<i64>;

    fn set_local_id(&mut self, id: Option<i64>);

    fn find_by_remote_id(conn: &Connection, remote_id: i64) -> AppResult<Option<Self>> {
        let sql = format!("SELECT {} FROM {} WHERE remote_id = ?1", Self::COLUMNS, Self::TABLE);
        conn.query_row(&sql, [remote_id], Self::from_row)
            .optional()
            .map_err(AppError::from)
    }
}

pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    refreshers: RwLock<HashMap<&'static str, Vec<Refresher>>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("db_path", &self.db_path).finish()
    }
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        tracing::debug!(path = %path.to_string_lossy(), "opened local store");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
            refreshers: RwLock::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }

    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> AppResult<T>) -> AppResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` in a transaction and, once committed, refreshes the
    /// observers of `tables` before the connection is released.
    pub fn write<T>(
        &self,
        tables: &[&'static str],
        f: impl FnOnce(&Connection) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        self.publish(&conn, tables);
        Ok(out)
    }

    /// Registers `refresher` for `table` and runs it once under the
    /// connection lock, so the first published state is never stale.
    pub fn on_change(&self, table: &'static str, refresher: Refresher) -> AppResult<()> {
        {
            let mut refreshers = self
                .refreshers
                .write()
                .map_err(|_| AppError::Internal("refresher registry poisoned".to_string()))?;
            refreshers.entry(table).or_default().push(refresher.clone());
        }
        let conn = self.lock()?;
        refresher(&conn).map(|_| ())
    }

    /// Runs the refreshers of `tables` and drops those whose observer is gone.
    fn publish(&self, conn: &Connection, tables: &[&'static str]) {
        let Ok(mut refreshers) = self.refreshers.write() else {
            tracing::error!("refresher registry poisoned; snapshots not published");
            return;
        };
        for table in tables {
            let Some(registered) = refreshers.get_mut(table) else {
                continue;
            };
            registered.retain(|refresher| match refresher(conn) {
                Ok(ObserverState::Live) => true,
                Ok(ObserverState::Dropped) => false,
                Err(error) => {
                    tracing::warn!(table = %table, error = %error, "failed to publish table snapshot");
                    true
                }
            });
        }
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self, table: &str) -> usize {
        self.refreshers
            .read()
            .map(|refreshers| refreshers.get(table).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn insert<E: StoredEntity>(&self, entity: &E) -> AppResult<i64> {
        entity.validate()?;
        self.write(&[E::TABLE], |conn| E::upsert(conn, entity))
    }

    /// Upserts every row in one transaction; observers see one snapshot.
    pub fn insert_all<E: StoredEntity>(&self, entities: &[E]) -> AppResult<usize> {
        for entity in entities {
            entity.validate()?;
        }
        self.write(&[E::TABLE], |conn| {
            for entity in entities {
                E::upsert(conn, entity)?;
            }
            Ok(entities.len())
        })
    }

    /// Stores rows that came from the backend in one transaction. A row
    /// without a local id takes over the local row already carrying its
    /// `remote_id`, so re-fetching never duplicates and rows that were never
    /// synced are left alone. Returns the rows with their local ids.
    pub fn merge_remote<E: RemoteMirrored>(&self, rows: Vec<E>) -> AppResult<Vec<E>> {
        for row in &rows {
            row.validate()?;
        }
        self.write(&[E::TABLE], |conn| {
            rows.into_iter()
                .map(|mut row| -> AppResult<E> {
                    if row.key().is_none() {
                        if let Some(remote_id) = row.remote_id() {
                            let existing = E::find_by_remote_id(conn, remote_id)?;
                            row.set_local_id(existing.and_then(|stored| stored.key()));
                        }
                    }
                    let id = E::upsert(conn, &row)?;
                    row.set_local_id(Some(id));
                    Ok(row)
                })
                .collect()
        })
    }

    pub fn update<E: StoredEntity>(&self, entity: &E) -> AppResult<()> {
        entity.validate()?;
        self.write(&[E::TABLE], |conn| E::update(conn, entity))
    }

    pub fn delete<E: StoredEntity>(&self, id: i64) -> AppResult<bool> {
        let mut tables = vec![E::TABLE];
        tables.extend_from_slice(E::CASCADES_TO);
        self.write(&tables, |conn| E::delete(conn, id))
    }

    pub fn get<E: StoredEntity>(&self, id: i64) -> AppResult<Option<E>> {
        self.read(|conn| E::get(conn, id))
    }

    pub fn list<E: StoredEntity>(&self) -> AppResult<Vec<E>> {
        self.read(|conn| E::list(conn))
    }

    pub fn get_setting(&self, key: &str) -> AppResult<Option<serde_json::Value>> {
        let conn = self.lock()?;
        let raw = conn
            .query_row("SELECT value_json FROM settings WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        raw.map(|raw| serde_json::from_str(&raw).map_err(AppError::from))
            .transpose()
    }

    pub fn put_setting(&self, key: &str, value: &serde_json::Value) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![key, serde_json::to_string(value)?, format_time(&Utc::now())],
        )?;
        Ok(())
    }

    pub fn delete_setting(&self, key: &str) -> AppResult<bool> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM settings WHERE key = ?1", [key])? > 0)
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
pub(crate) fn format_time(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, error.to_string())),
            )
        })
}

pub(crate) fn require_key<E: StoredEntity>(entity: &E) -> AppResult<i64> {
    entity
        .key()
        .ok_or_else(|| AppError::NotFound(format!("{} row has no id", E::TABLE)))
}

pub(crate) fn ensure_updated<E: StoredEntity>(changed: usize, id: i64) -> AppResult<()> {
    if changed == 0 {
        return Err(AppError::NotFound(format!("{} {} does not exist", E::TABLE, id)));
    }
    Ok(())
}
