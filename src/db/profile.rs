use super::{ensure_updated, StoredEntity};
use crate::errors::AppResult;
use crate::models::{Profile, PROFILE_ID};
use rusqlite::{params, Connection, Row};

impl StoredEntity for Profile {
    const TABLE: &'static str = "profile";
    const COLUMNS: &'static str = "name, date_of_birth, region, country, mobile, photo_uri";

    fn key(&self) -> Option<i64> {
        Some(PROFILE_ID)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Profile {
            name: row.get(0)?,
            date_of_birth: row.get(1)?,
            region: row.get(2)?,
            country: row.get(3)?,
            mobile: row.get(4)?,
            photo_uri: row.get(5)?,
        })
    }

    fn upsert(conn: &Connection, entity: &Self) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO profile (id, name, date_of_birth, region, country, mobile, photo_uri)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               date_of_birth = excluded.date_of_birth,
               region = excluded.region,
               country = excluded.country,
               mobile = excluded.mobile,
               photo_uri = excluded.photo_uri",
            params![
                PROFILE_ID,
                entity.name,
                entity.date_of_birth,
                entity.region,
                entity.country,
                entity.mobile,
                entity.photo_uri,
            ],
        )?;
        Ok(PROFILE_ID)
    }

    fn update(conn: &Connection, entity: &Self) -> AppResult<()> {
        let changed = conn.execute(
            "UPDATE profile SET name = ?1, date_of_birth = ?2, region = ?3, country = ?4, mobile = ?5, photo_uri = ?6
             WHERE id = ?7",
            params![
                entity.name,
                entity.date_of_birth,
                entity.region,
                entity.country,
                entity.mobile,
                entity.photo_uri,
                PROFILE_ID,
            ],
        )?;
        ensure_updated::<Self>(changed, PROFILE_ID)
    }
}
