use crate::errors::{AppError, AppResult};
use std::path::Path;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG_FILTER: &str = "MLTRACK_LOG";
const LOG_FILE_PREFIX: &str = "lifecycle.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global JSON subscriber writing to a daily file under
/// `log_dir`. Fails if a global subscriber is already set.
pub fn init_tracing(log_dir: &Path) -> AppResult<()> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| AppError::Internal(format!("failed to install tracing subscriber: {}", error)))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG_FILTER).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::init_tracing;
    use crate::errors::AppError;

    #[test]
    fn second_install_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        init_tracing(dir.path()).expect("first install");
        tracing::info!("subscriber installed");
        assert!(matches!(init_tracing(dir.path()), Err(AppError::Internal(_))));
    }
}
