use crate::db::Database;
use crate::errors::{AppError, AppResult};
use std::sync::{Arc, RwLock};

const TOKEN_SETTING_KEY: &str = "auth.token";

/// Holder of the API token attached to every outgoing request.
///
/// The persisted setting distinguishes "never seeded" (no row) from
/// "cleared by the user" (JSON null), so the fallback is applied once.
#[derive(Clone)]
pub struct TokenStore {
    db: Option<Arc<Database>>,
    current: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn load_or_seed(db: Arc<Database>, fallback: Option<&str>) -> AppResult<Self> {
        let current = match db.get_setting(TOKEN_SETTING_KEY)? {
            Some(serde_json::Value::String(token)) => Some(token),
            Some(_) => None,
            None => {
                let seeded = fallback.map(str::trim).filter(|token| !token.is_empty()).map(str::to_string);
                db.put_setting(TOKEN_SETTING_KEY, &serde_json::to_value(&seeded)?)?;
                if seeded.is_some() {
                    tracing::info!("seeded API token from configured fallback");
                }
                seeded
            }
        };
        Ok(Self {
            db: Some(db),
            current: Arc::new(RwLock::new(current)),
        })
    }

    /// A store that lives only in memory.
    pub fn ephemeral(token: Option<String>) -> Self {
        Self {
            db: None,
            current: Arc::new(RwLock::new(token)),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    /// Header value for `Authorization`, if a token is stored.
    pub fn authorization(&self) -> Option<String> {
        self.token().map(|token| format!("Token {}", token))
    }

    pub fn set_token(&self, token: &str) -> AppResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Validation("API token cannot be empty".to_string()));
        }
        self.store(Some(token.to_string()))
    }

    pub fn clear(&self) -> AppResult<()> {
        self.store(None)
    }

    fn store(&self, token: Option<String>) -> AppResult<()> {
        if let Some(db) = &self.db {
            db.put_setting(TOKEN_SETTING_KEY, &serde_json::to_value(&token)?)?;
        }
        let mut guard = self
            .current
            .write()
            .map_err(|_| AppError::Internal("token store lock poisoned".to_string()))?;
        *guard = token;
        Ok(())
    }
}
