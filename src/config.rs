use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_BASE_URL: &str = "MLTRACK_API_BASE_URL";
pub const ENV_API_TOKEN: &str = "MLTRACK_API_TOKEN";
pub const ENV_DATA_DIR: &str = "MLTRACK_DATA_DIR";

/// Settings for the REST backend. One base URL serves both the
/// `api-content/` resources and the legacy `projects/` resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    pub base_url: String,
    pub content_prefix: String,
    pub legacy_projects_path: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub get_retries: u32,
    pub retry_backoff_ms: u64,
    /// Seeded into the token store on the first start only.
    pub fallback_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/".to_string(),
            content_prefix: "api-content/".to_string(),
            legacy_projects_path: "projects/".to_string(),
            connect_timeout_secs: 30,
            request_timeout_secs: 30,
            get_retries: 2,
            retry_backoff_ms: 500,
            fallback_token: None,
        }
    }
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `<base>/<content_prefix><resource>/`
    pub fn content_url(&self, resource: &str) -> String {
        format!(
            "{}/{}/{}/",
            self.base_url.trim_end_matches('/'),
            self.content_prefix.trim_matches('/'),
            resource.trim_matches('/')
        )
    }

    pub fn legacy_projects_url(&self) -> String {
        format!(
            "{}/{}/",
            self.base_url.trim_end_matches('/'),
            self.legacy_projects_path.trim_matches('/')
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub log_dir: Option<PathBuf>,
    pub api: ApiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database_file: "lifecycle.db".to_string(),
            log_dir: None,
            api: ApiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads `path` when given (missing keys keep their defaults), then
    /// applies `MLTRACK_*` environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str::<AppConfig>(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => AppConfig::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup(ENV_API_BASE_URL).filter(|value| !value.trim().is_empty()) {
            self.api.base_url = base_url;
        }
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|value| !value.trim().is_empty()) {
            self.api.fallback_token = Some(token);
        }
        if let Some(data_dir) = lookup(ENV_DATA_DIR).filter(|value| !value.trim().is_empty()) {
            self.data_dir = PathBuf::from(data_dir);
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| self.data_dir.join("logs"))
    }
}
