use super::{ensure_updated, format_time, parse_time, require_key, ProjectScoped, RemoteMirrored, StoredEntity};
use crate::errors::AppResult;
use crate::models::ModelTraining;
use rusqlite::{params, Connection, Row};

impl StoredEntity for ModelTraining {
    const TABLE: &'static str = "model_trainings";
    const COLUMNS: &'static str = "id, remote_id, project_name, model_name, model_type, algorithm, training_data, performance, model_path, refinement_strategy, performance_after_refinement, created_at";

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ModelTraining {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            project_name: row.get(2)?,
            model_name: row.get(3)?,
            model_type: row.get(4)?,
            algorithm: row.get(5)?,
            training_data: row.get(6)?,
            performance: row.get(7)?,
            model_path: row.get(8)?,
            refinement_strategy: row.get(9)?,
            performance_after_refinement: row.get(10)?,
            created_at: parse_time(&row.get::<_, String>(11)?)?,
        })
    }

    fn upsert(conn: &Connection, entity: &Self) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO model_trainings (
               id, remote_id, project_name, model_name, model_type, algorithm, training_data, performance,
               model_path, refinement_strategy, performance_after_refinement, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
               remote_id = excluded.remote_id,
               project_name = excluded.project_name,
               model_name = excluded.model_name,
               model_type = excluded.model_type,
               algorithm = excluded.algorithm,
               training_data = excluded.training_data,
               performance = excluded.performance,
               model_path = excluded.model_path,
               refinement_strategy = excluded.refinement_strategy,
               performance_after_refinement = excluded.performance_after_refinement,
               created_at = excluded.created_at",
            params![
                entity.id,
                entity.remote_id,
                entity.project_name,
                entity.model_name,
                entity.model_type,
                entity.algorithm,
                entity.training_data,
                entity.performance,
                entity.model_path,
                entity.refinement_strategy,
                entity.performance_after_refinement,
                format_time(&entity.created_at),
            ],
        )?;
        Ok(entity.id.unwrap_or_else(|| conn.last_insert_rowid()))
    }

    fn update(conn: &Connection, entity: &Self) -> AppResult<()> {
        let id = require_key(entity)?;
        let changed = conn.execute(
            "UPDATE model_trainings SET remote_id = ?1, project_name = ?2, model_name = ?3, model_type = ?4, algorithm = ?5,
               training_data = ?6, performance = ?7, model_path = ?8, refinement_strategy = ?9,
               performance_after_refinement = ?10, created_at = ?11
             WHERE id = ?12",
            params![
                entity.remote_id,
                entity.project_name,
                entity.model_name,
                entity.model_type,
                entity.algorithm,
                entity.training_data,
                entity.performance,
                entity.model_path,
                entity.refinement_strategy,
                entity.performance_after_refinement,
                format_time(&entity.created_at),
                id,
            ],
        )?;
        ensure_updated::<Self>(changed, id)
    }
}

impl ProjectScoped for ModelTraining {
    const CREATED_COLUMN: &'static str = "created_at";

    fn project_name(&self) -> &str {
        &self.project_name
    }
}

impl RemoteMirrored for ModelTraining {
    fn remote_id(&self) -> Option<i64> {
        self.remote_id
    }

    fn set_local_id(&mut self, id: Option<i64>) {
        self.id = id;
    }
}
