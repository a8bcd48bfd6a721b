use super::{ensure_updated, require_key, StoredEntity};
use crate::errors::{AppError, AppResult};
use crate::models::MeaningfulObjectives;
use rusqlite::{params, Connection, Row};

impl StoredEntity for MeaningfulObjectives {
    const TABLE: &'static str = "meaningful_objectives";
    const KEY_COLUMN: &'static str = "mo_id";
    const COLUMNS: &'static str = "mo_id, project_id, objective_name, organizational, leading_indicators, user_outcomes, model_properties";

    fn key(&self) -> Option<i64> {
        self.mo_id
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(MeaningfulObjectives {
            mo_id: row.get(0)?,
            project_id: row.get(1)?,
            objective_name: row.get(2)?,
            organizational: row.get(3)?,
            leading_indicators: row.get(4)?,
            user_outcomes: row.get(5)?,
            model_properties: row.get(6)?,
        })
    }

    fn upsert(conn: &Connection, entity: &Self) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO meaningful_objectives (
               mo_id, project_id, objective_name, organizational, leading_indicators, user_outcomes, model_properties
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(mo_id) DO UPDATE SET
               project_id = excluded.project_id,
               objective_name = excluded.objective_name,
               organizational = excluded.organizational,
               leading_indicators = excluded.leading_indicators,
               user_outcomes = excluded.user_outcomes,
               model_properties = excluded.model_properties",
            params![
                entity.mo_id,
                entity.project_id,
                entity.objective_name,
                entity.organizational,
                entity.leading_indicators,
                entity.user_outcomes,
                entity.model_properties,
            ],
        )?;
        Ok(entity.mo_id.unwrap_or_else(|| conn.last_insert_rowid()))
    }

    fn update(conn: &Connection, entity: &Self) -> AppResult<()> {
        let id = require_key(entity)?;
        let changed = conn.execute(
            "UPDATE meaningful_objectives SET project_id = ?1, objective_name = ?2, organizational = ?3,
               leading_indicators = ?4, user_outcomes = ?5, model_properties = ?6
             WHERE mo_id = ?7",
            params![
                entity.project_id,
                entity.objective_name,
                entity.organizational,
                entity.leading_indicators,
                entity.user_outcomes,
                entity.model_properties,
                id,
            ],
        )?;
        ensure_updated::<Self>(changed, id)
    }
}

pub fn list_for_project_id(conn: &Connection, project_id: i64) -> AppResult<Vec<MeaningfulObjectives>> {
    let mut statement = conn.prepare(
        "SELECT mo_id, project_id, objective_name, organizational, leading_indicators, user_outcomes, model_properties
         FROM meaningful_objectives WHERE project_id = ?1 ORDER BY mo_id ASC",
    )?;
    let rows = statement
        .query_map([project_id], MeaningfulObjectives::from_row)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(AppError::from)?;
    Ok(rows)
}
