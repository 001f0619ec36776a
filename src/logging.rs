use crate::config::LogConfig;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber: JSON to a daily file when a log dir is set, else stderr.
pub fn init(config: &LogConfig) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match &config.dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
            let file_appender = tracing_appender::rolling::daily(log_dir, "health-metrics.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(non_blocking)
                .try_init()
                .map_err(|error| error.to_string())
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|error| error.to_string()),
    }
}
