use super::{ensure_updated, format_time, parse_time, require_key, ProjectScoped, RemoteMirrored, StoredEntity};
use crate::errors::AppResult;
use crate::models::DataProcessing;
use rusqlite::{params, Connection, Row};

impl StoredEntity for DataProcessing {
    const TABLE: &'static str = "data_processings";
    const COLUMNS: &'static str = "id, remote_id, project_name, source_data, transformation_steps, feature_engineering, processed_file_location, processed_file_name, processing_status, created_at";

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(DataProcessing {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            project_name: row.get(2)?,
            source_data: row.get(3)?,
            transformation_steps: row.get(4)?,
            feature_engineering: row.get(5)?,
            processed_file_location: row.get(6)?,
            processed_file_name: row.get(7)?,
            processing_status: row.get(8)?,
            created_at: parse_time(&row.get::<_, String>(9)?)?,
        })
    }

    fn upsert(conn: &Connection, entity: &Self) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO data_processings (
               id, remote_id, project_name, source_data, transformation_steps, feature_engineering,
               processed_file_location, processed_file_name, processing_status, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
               remote_id = excluded.remote_id,
               project_name = excluded.project_name,
               source_data = excluded.source_data,
               transformation_steps = excluded.transformation_steps,
               feature_engineering = excluded.feature_engineering,
               processed_file_location = excluded.processed_file_location,
               processed_file_name = excluded.processed_file_name,
               processing_status = excluded.processing_status,
               created_at = excluded.created_at",
            params![
                entity.id,
                entity.remote_id,
                entity.project_name,
                entity.source_data,
                entity.transformation_steps,
                entity.feature_engineering,
                entity.processed_file_location,
                entity.processed_file_name,
                entity.processing_status,
                format_time(&entity.created_at),
            ],
        )?;
        Ok(entity.id.unwrap_or_else(|| conn.last_insert_rowid()))
    }

    fn update(conn: &Connection, entity: &Self) -> AppResult<()> {
        let id = require_key(entity)?;
        let changed = conn.execute(
            "UPDATE data_processings SET remote_id = ?1, project_name = ?2, source_data = ?3, transformation_steps = ?4,
               feature_engineering = ?5, processed_file_location = ?6, processed_file_name = ?7,
               processing_status = ?8, created_at = ?9
             WHERE id = ?10",
            params![
                entity.remote_id,
                entity.project_name,
                entity.source_data,
                entity.transformation_steps,
                entity.feature_engineering,
                entity.processed_file_location,
                entity.processed_file_name,
                entity.processing_status,
                format_time(&entity.created_at),
                id,
            ],
        )?;
        ensure_updated::<Self>(changed, id)
    }
}

impl ProjectScoped for DataProcessing {
    const CREATED_COLUMN: &'static str = "created_at";

    fn project_name(&self) -> &str {
        &self.project_name
    }
}

impl RemoteMirrored for DataProcessing {
    fn remote_id(&self) -> Option<i64> {
        self.remote_id
    }

    fn set_local_id(&mut self, id: Option<i64>) {
        self.id = id;
    }
}
