use super::{ensure_updated, format_time, parse_time, require_key, ProjectScoped, RemoteMirrored, StoredEntity};
use crate::errors::AppResult;
use crate::models::DataEntry;
use rusqlite::{params, Connection, Row};

impl StoredEntity for DataEntry {
    const TABLE: &'static str = "data_entries";
    const COLUMNS: &'static str = "id, remote_id, project_name, problem_description, target, stock, inflow, outflow, data_needed, framed_by, date_created";

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(DataEntry {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            project_name: row.get(2)?,
            problem_description: row.get(3)?,
            target: row.get(4)?,
            stock: row.get(5)?,
            inflow: row.get(6)?,
            outflow: row.get(7)?,
            data_needed: row.get(8)?,
            framed_by: row.get(9)?,
            date_created: parse_time(&row.get::<_, String>(10)?)?,
        })
    }

    fn upsert(conn: &Connection, entity: &Self) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO data_entries (
               id, remote_id, project_name, problem_description, target, stock, inflow, outflow, data_needed, framed_by, date_created
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
               remote_id = excluded.remote_id,
               project_name = excluded.project_name,
               problem_description = excluded.problem_description,
               target = excluded.target,
               stock = excluded.stock,
               inflow = excluded.inflow,
               outflow = excluded.outflow,
               data_needed = excluded.data_needed,
               framed_by = excluded.framed_by,
               date_created = excluded.date_created",
            params![
                entity.id,
                entity.remote_id,
                entity.project_name,
                entity.problem_description,
                entity.target,
                entity.stock,
                entity.inflow,
                entity.outflow,
                entity.data_needed,
                entity.framed_by,
                format_time(&entity.date_created),
            ],
        )?;
        Ok(entity.id.unwrap_or_else(|| conn.last_insert_rowid()))
    }

    fn update(conn: &Connection, entity: &Self) -> AppResult<()> {
        let id = require_key(entity)?;
        let changed = conn.execute(
            "UPDATE data_entries SET remote_id = ?1, project_name = ?2, problem_description = ?3, target = ?4, stock = ?5,
               inflow = ?6, outflow = ?7, data_needed = ?8, framed_by = ?9, date_created = ?10
             WHERE id = ?11",
            params![
                entity.remote_id,
                entity.project_name,
                entity.problem_description,
                entity.target,
                entity.stock,
                entity.inflow,
                entity.outflow,
                entity.data_needed,
                entity.framed_by,
                format_time(&entity.date_created),
                id,
            ],
        )?;
        ensure_updated::<Self>(changed, id)
    }
}

impl ProjectScoped for DataEntry {
    const CREATED_COLUMN: &'static str = "date_created";

    fn project_name(&self) -> &str {
        &self.project_name
    }
}

impl RemoteMirrored for DataEntry {
    fn remote_id(&self) -> Option<i64> {
        self.remote_id
    }

    fn set_local_id(&mut self, id: Option<i64>) {
        self.id = id;
    }
}
