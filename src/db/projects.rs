use super::{ensure_updated, require_key, RemoteMirrored, StoredEntity, PROJECT_SCOPED_TABLES};
use crate::errors::{AppError, AppResult};
use crate::models::Project;
use rusqlite::{params, Connection, OptionalExtension, Row};

impl StoredEntity for Project {
    const TABLE: &'static str = "projects";
    const COLUMNS: &'static str =
        "id, remote_id, project_name, description, status, created_by, start_date, end_date, client_name, location";
    const CASCADES_TO: &'static [&'static str] = &["meaningful_objectives"];

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> AppResult<()> {
        Project::validate(self)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Project {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            project_name: row.get(2)?,
            description: row.get(3)?,
            status: row.get(4)?,
            created_by: row.get(5)?,
            start_date: row.get(6)?,
            end_date: row.get(7)?,
            client_name: row.get(8)?,
            location: row.get(9)?,
        })
    }

    fn upsert(conn: &Connection, entity: &Self) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO projects (
               id, remote_id, project_name, description, status, created_by, start_date, end_date, client_name, location
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
               remote_id = excluded.remote_id,
               project_name = excluded.project_name,
               description = excluded.description,
               status = excluded.status,
               created_by = excluded.created_by,
               start_date = excluded.start_date,
               end_date = excluded.end_date,
               client_name = excluded.client_name,
               location = excluded.location",
            params![
                entity.id,
                entity.remote_id,
                entity.project_name,
                entity.description,
                entity.status,
                entity.created_by,
                entity.start_date,
                entity.end_date,
                entity.client_name,
                entity.location,
            ],
        )?;
        Ok(entity.id.unwrap_or_else(|| conn.last_insert_rowid()))
    }

    fn update(conn: &Connection, entity: &Self) -> AppResult<()> {
        let id = require_key(entity)?;
        let changed = conn.execute(
            "UPDATE projects SET remote_id = ?1, project_name = ?2, description = ?3, status = ?4,
               created_by = ?5, start_date = ?6, end_date = ?7, client_name = ?8, location = ?9
             WHERE id = ?10",
            params![
                entity.remote_id,
                entity.project_name,
                entity.description,
                entity.status,
                entity.created_by,
                entity.start_date,
                entity.end_date,
                entity.client_name,
                entity.location,
                id,
            ],
        )?;
        ensure_updated::<Self>(changed, id)
    }
}

impl RemoteMirrored for Project {
    fn remote_id(&self) -> Option<i64> {
        self.remote_id
    }

    fn set_local_id(&mut self, id: Option<i64>) {
        self.id = id;
    }
}

/// Renames a project and re-points every record that references it by name.
///
/// Must run inside a write transaction so the rename and the re-pointing
/// commit together.
pub fn rename(conn: &Connection, id: i64, new_name: &str) -> AppResult<Project> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(AppError::Validation("Project name cannot be empty".to_string()));
    }
    let Some(current) = Project::get(conn, id)? else {
        return Err(AppError::NotFound(format!("projects {} does not exist", id)));
    };

    conn.execute(
        "UPDATE projects SET project_name = ?1 WHERE id = ?2",
        params![new_name, id],
    )?;
    let mut moved = 0usize;
    for table in PROJECT_SCOPED_TABLES {
        let sql = format!("UPDATE {} SET project_name = ?1 WHERE project_name = ?2", table);
        moved += conn.execute(&sql, params![new_name, current.project_name])?;
    }
    tracing::debug!(project_id = id, moved, "renamed project and re-pointed associated records");

    Ok(Project {
        project_name: new_name.to_string(),
        ..current
    })
}

/// First project (lowest id) carrying `project_name`, preferring one the
/// backend already knows.
pub fn find_by_name(conn: &Connection, project_name: &str) -> AppResult<Option<Project>> {
    let sql = format!(
        "SELECT {} FROM projects WHERE project_name = ?1 ORDER BY remote_id IS NULL, id ASC LIMIT 1",
        Project::COLUMNS
    );
    conn.query_row(&sql, [project_name], Project::from_row)
        .optional()
        .map_err(AppError::from)
}
