//! Logging Infrastructure
//!
//! Console output (pretty or JSON) plus an optional daily rotating file.
//! Rotated files older than 14 days are deleted at startup and then hourly.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, Local, NaiveDate};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// File name prefix of rotated log files (`bridge.YYYY-MM-DD`)
const LOG_PREFIX: &str = "bridge";

const RETENTION_DAYS: u64 = 14;

/// Initialize the logging system
///
/// `RUST_LOG` wins over `level` when set.
///
/// ```no_run
/// // Development: console only
/// kassa_bridge::common::init_logger_with_file("debug", false, None)?;
///
/// // Production: JSON console + rotated files
/// kassa_bridge::common::init_logger_with_file("info", true, Some("./work_dir/logs"))?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (json_layer, pretty_layer) = if json_format {
        let layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_thread_ids(true);
        (Some(layer), None)
    } else {
        let layer = fmt::layer().with_target(true).with_thread_ids(false);
        (None, Some(layer))
    };

    let file_layer = match log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            fs::create_dir_all(log_dir)?;

            let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_PREFIX);
            tokio::spawn(periodic_cleanup(log_dir.to_path_buf()));

            Some(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(appender)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

/// Delete rotated log files older than 14 days, returns how many went
pub fn cleanup_old_logs(log_dir: &Path) -> anyhow::Result<usize> {
    let today = Local::now().date_naive();
    let cutoff = today.checked_sub_days(Days::new(RETENTION_DAYS)).unwrap_or(today);
    cleanup_logs_before(log_dir, cutoff)
}

fn cleanup_logs_before(log_dir: &Path, cutoff: NaiveDate) -> anyhow::Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(log_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if let Some(date_part) = name
            .strip_prefix(LOG_PREFIX)
            .and_then(|rest| rest.strip_prefix('.'))
            && let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            && date < cutoff
        {
            fs::remove_file(&path)?;
            tracing::info!(file = %name, "Deleted old log file");
            removed += 1;
        }
    }

    Ok(removed)
}

/// Runs at startup, then every hour
async fn periodic_cleanup(log_dir: PathBuf) {
    use tokio::time::{Duration, interval};

    let mut ticker = interval(Duration::from_secs(3600));
    loop {
        ticker.tick().await;
        if let Err(e) = cleanup_old_logs(&log_dir) {
            tracing::error!(error = %e, "Failed to cleanup old logs");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"log").unwrap();
    }

    #[test]
    fn test_cleanup_removes_only_old_rotations() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "bridge.2026-09-01");
        touch(dir.path(), "bridge.2026-10-04");
        touch(dir.path(), "bridge.2026-10-19");
        touch(dir.path(), "bridge.not-a-date");
        touch(dir.path(), "other.2026-01-01");

        let cutoff = NaiveDate::from_ymd_opt(2026, 10, 5).unwrap();
        let removed = cleanup_logs_before(dir.path(), cutoff).unwrap();

        assert_eq!(removed, 2);
        assert!(!dir.path().join("bridge.2026-09-01").exists());
        assert!(!dir.path().join("bridge.2026-10-04").exists());
        assert!(dir.path().join("bridge.2026-10-19").exists());
        assert!(dir.path().join("bridge.not-a-date").exists());
        assert!(dir.path().join("other.2026-01-01").exists());
    }

    #[test]
    fn test_cleanup_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("logs");
        assert_eq!(cleanup_old_logs(&missing).unwrap(), 0);
    }
}
