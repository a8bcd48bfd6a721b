use super::{ensure_updated, format_time, parse_time, require_key, ProjectScoped, RemoteMirrored, StoredEntity};
use crate::errors::{AppError, AppResult};
use crate::models::DatasetRequest;
use rusqlite::{params, Connection, Row};

impl StoredEntity for DatasetRequest {
    const TABLE: &'static str = "dataset_requests";
    const COLUMNS: &'static str = "id, remote_id, project_name, description, feature_count, dataset_size, expected_file_format, data_type, data_processing, start_date, end_date, target, requested_by, status, created_at";

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> AppResult<()> {
        if self.feature_count < 0 {
            return Err(AppError::Validation("featureCount cannot be negative".to_string()));
        }
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(DatasetRequest {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            project_name: row.get(2)?,
            description: row.get(3)?,
            feature_count: row.get(4)?,
            dataset_size: row.get(5)?,
            expected_file_format: row.get(6)?,
            data_type: row.get(7)?,
            data_processing: row.get(8)?,
            start_date: row.get(9)?,
            end_date: row.get(10)?,
            target: row.get(11)?,
            requested_by: row.get(12)?,
            status: row.get(13)?,
            created_at: parse_time(&row.get::<_, String>(14)?)?,
        })
    }

    fn upsert(conn: &Connection, entity: &Self) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO dataset_requests (
               id, remote_id, project_name, description, feature_count, dataset_size, expected_file_format, data_type,
               data_processing, start_date, end_date, target, requested_by, status, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(id) DO UPDATE SET
               remote_id = excluded.remote_id,
               project_name = excluded.project_name,
               description = excluded.description,
               feature_count = excluded.feature_count,
               dataset_size = excluded.dataset_size,
               expected_file_format = excluded.expected_file_format,
               data_type = excluded.data_type,
               data_processing = excluded.data_processing,
               start_date = excluded.start_date,
               end_date = excluded.end_date,
               target = excluded.target,
               requested_by = excluded.requested_by,
               status = excluded.status,
               created_at = excluded.created_at",
            params![
                entity.id,
                entity.remote_id,
                entity.project_name,
                entity.description,
                entity.feature_count,
                entity.dataset_size,
                entity.expected_file_format,
                entity.data_type,
                entity.data_processing,
                entity.start_date,
                entity.end_date,
                entity.target,
                entity.requested_by,
                entity.status,
                format_time(&entity.created_at),
            ],
        )?;
        Ok(entity.id.unwrap_or_else(|| conn.last_insert_rowid()))
    }

    fn update(conn: &Connection, entity: &Self) -> AppResult<()> {
        let id = require_key(entity)?;
        let changed = conn.execute(
            "UPDATE dataset_requests SET remote_id = ?1, project_name = ?2, description = ?3, feature_count = ?4,
               dataset_size = ?5, expected_file_format = ?6, data_type = ?7, data_processing = ?8,
               start_date = ?9, end_date = ?10, target = ?11, requested_by = ?12, status = ?13, created_at = ?14
             WHERE id = ?15",
            params![
                entity.remote_id,
                entity.project_name,
                entity.description,
                entity.feature_count,
                entity.dataset_size,
                entity.expected_file_format,
                entity.data_type,
                entity.data_processing,
                entity.start_date,
                entity.end_date,
                entity.target,
                entity.requested_by,
                entity.status,
                format_time(&entity.created_at),
                id,
            ],
        )?;
        ensure_updated::<Self>(changed, id)
    }
}

impl ProjectScoped for DatasetRequest {
    const CREATED_COLUMN: &'static str = "created_at";

    fn project_name(&self) -> &str {
        &self.project_name
    }
}

impl RemoteMirrored for DatasetRequest {
    fn remote_id(&self) -> Option<i64> {
        self.remote_id
    }

    fn set_local_id(&mut self, id: Option<i64>) {
        self.id = id;
    }
}
