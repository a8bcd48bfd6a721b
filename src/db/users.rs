use super::{ensure_updated, require_key, StoredEntity};
use crate::errors::{AppError, AppResult};
use crate::models::{normalize_email, User};
use rusqlite::{params, Connection, OptionalExtension, Row};

impl StoredEntity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, email, username, password_hash";

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> AppResult<()> {
        normalize_email(&self.email)?;
        if self.password_hash.is_empty() {
            return Err(AppError::Validation("User has no password hash".to_string()));
        }
        Ok(())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            password_hash: row.get(3)?,
        })
    }

    fn upsert(conn: &Connection, entity: &Self) -> AppResult<i64> {
        let email = normalize_email(&entity.email)?;
        ensure_email_free(conn, &email, entity.id)?;
        conn.execute(
            "INSERT INTO users (id, email, username, password_hash) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
               email = excluded.email,
               username = excluded.username,
               password_hash = excluded.password_hash",
            params![entity.id, email, entity.username, entity.password_hash],
        )?;
        Ok(entity.id.unwrap_or_else(|| conn.last_insert_rowid()))
    }

    fn update(conn: &Connection, entity: &Self) -> AppResult<()> {
        let id = require_key(entity)?;
        let email = normalize_email(&entity.email)?;
        ensure_email_free(conn, &email, Some(id))?;
        let changed = conn.execute(
            "UPDATE users SET email = ?1, username = ?2, password_hash = ?3 WHERE id = ?4",
            params![email, entity.username, entity.password_hash, id],
        )?;
        ensure_updated::<Self>(changed, id)
    }
}

/// The schema does not carry a UNIQUE constraint on email; this check is
/// the only guard, so it runs inside the same write transaction.
fn ensure_email_free(conn: &Connection, email: &str, owner: Option<i64>) -> AppResult<()> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE email = ?1 LIMIT 1", [email], |row| row.get(0))
        .optional()?;
    match existing {
        Some(id) if Some(id) != owner => Err(AppError::Constraint(format!(
            "email '{}' is already registered",
            email
        ))),
        _ => Ok(()),
    }
}

/// An address that is not a valid email cannot be registered, so it is
/// simply not found.
pub fn find_by_email(conn: &Connection, email: &str) -> AppResult<Option<User>> {
    let Ok(email) = normalize_email(email) else {
        return Ok(None);
    };
    conn.query_row(
        "SELECT id, email, username, password_hash FROM users WHERE email = ?1",
        [email],
        User::from_row,
    )
    .optional()
    .map_err(AppError::from)
}
