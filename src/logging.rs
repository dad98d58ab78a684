use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "continuum-amp.log";

/// Flushes the JSON log file when dropped; hold it until `main` returns.
pub struct LoggingGuard(WorkerGuard);

pub fn init_tracing(logging_config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = log_dir(&logging_config.dir)?;
    let env_filter = EnvFilter::try_new(&logging_config.filter)
        .with_context(|| format!("failed to parse logging.filter '{}'", logging_config.filter))?;

    let purge_warnings =
        purge_expired_logs(&log_dir, LOG_FILE_PREFIX, logging_config.retention_days);
    let appender = match logging_config.rotation {
        LoggingRotation::Daily => rolling::daily(&log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => rolling::hourly(&log_dir, LOG_FILE_PREFIX),
    };
    let (file_writer, worker_guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(
            fmt::layer()
                .json()
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(env_filter),
        )
        .with(logging_config.stderr_warn_enabled.then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(LevelFilter::WARN)
        }))
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    // Every file event of one invocation shares this id.
    tracing::info!(
        target: "logging",
        run_id = %Uuid::now_v7(),
        dir = %log_dir.display(),
        rotation = ?logging_config.rotation,
        "continuum_logging_started"
    );
    for warning in purge_warnings {
        tracing::warn!(target: "logging", warning = %warning, "expired_log_purge_failed");
    }

    Ok(LoggingGuard(worker_guard))
}

/// Absolute, existing log directory. Relative paths hang off the working directory.
fn log_dir(configured: &Path) -> Result<PathBuf> {
    if configured.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }
    let dir = if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        std::env::current_dir()
            .context("failed to resolve relative logging.dir")?
            .join(configured)
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create logging directory {}", dir.display()))?;
    Ok(dir)
}

fn purge_expired_logs(log_dir: &Path, prefix: &str, retention_days: usize) -> Vec<String> {
    purge_expired_logs_at(log_dir, prefix, retention_days, SystemTime::now())
}

/// Removes prefixed files last modified before the retention window. Problems come back as
/// warnings since the logger that would report them is not installed yet.
fn purge_expired_logs_at(
    log_dir: &Path,
    prefix: &str,
    retention_days: usize,
    now: SystemTime,
) -> Vec<String> {
    let retention = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60) as u64);
    let cutoff = now
        .checked_sub(retention)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => {
            return vec![format!(
                "failed to scan logging directory {}: {}",
                log_dir.display(),
                err
            )];
        }
    };

    let mut warnings = Vec::new();
    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|metadata| {
                if metadata.is_file() {
                    metadata.modified().map(Some)
                } else {
                    Ok(None)
                }
            });
        match modified {
            Ok(Some(modified)) if modified <= cutoff => {
                if let Err(err) = fs::remove_file(entry.path()) {
                    warnings.push(format!(
                        "failed to remove expired log file {}: {}",
                        entry.path().display(),
                        err
                    ));
                }
            }
            Ok(_) => {}
            Err(err) => warnings.push(format!(
                "failed to stat {}: {}",
                entry.path().display(),
                err
            )),
        }
    }

    warnings
}
