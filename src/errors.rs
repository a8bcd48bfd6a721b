use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("VALIDATION: {0}")]
    Validation(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("CONSTRAINT: {0}")]
    Constraint(String),
    #[error("UNKNOWN_FIELD: {entity} has no field '{field}'")]
    UnknownField { entity: &'static str, field: String },
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("REMOTE: {0}")]
    Remote(#[from] ApiError),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

/// Failure of a call against the REST backend.
///
/// A non-2xx response is not a transport failure: it carries the status
/// code and the raw body so callers can show the server's message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Timeouts and connection failures never reached the server's handler.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connect(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::SqliteFailure(inner, _)
                if inner.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(value.to_string())
            }
            _ => Self::Internal(value.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Internal(format!("store task aborted: {}", value))
    }
}

pub type AppResult<T> = Result<T, AppError>;
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::{AppError, ApiError};
    use rusqlite::Connection;

    #[test]
    fn constraint_failures_map_to_constraint_variant() {
        let conn = Connection::open_in_memory().expect("conn");
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);")
            .expect("schema");
        conn.execute("INSERT INTO t (name) VALUES ('a')", []).expect("insert");
        let error = conn
            .execute("INSERT INTO t (name) VALUES ('a')", [])
            .expect_err("duplicate");
        assert!(matches!(AppError::from(error), AppError::Constraint(_)));
    }

    #[test]
    fn only_timeouts_and_connect_failures_are_transient() {
        assert!(ApiError::Timeout("read".to_string()).is_transient());
        assert!(ApiError::Connect("dns".to_string()).is_transient());
        assert!(!ApiError::Http { status: 500, body: String::new() }.is_transient());
        assert_eq!(ApiError::Http { status: 404, body: String::new() }.status(), Some(404));
    }
}
