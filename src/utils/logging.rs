use std::path::Path;

use anyhow::Result;
use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{format::FmtSpan, writer::MakeWriterExt};

pub const CLI_PREFIX: &str = "cli";
pub const DAEMON_PREFIX: &str = "daemon";

/// A log file is rotated once it grows past this size.
const MAX_LOG_FILE_BYTES: u64 = 5 * 1024 * 1024;
/// How many rotated log files are kept around before the oldest is removed.
const RETAINED_LOG_FILES: usize = 5;

/// `<log_dir>/<prefix>.log`, rotated by size into `<prefix>.log.1` .. `<prefix>.log.N`.
fn log_file(
    prefix: &str,
    log_dir: &Path,
    max_bytes: u64,
    retained: usize,
) -> Result<BasicRollingFileAppender> {
    std::fs::create_dir_all(log_dir)?;
    Ok(BasicRollingFileAppender::new(
        log_dir.join(format!("{prefix}.log")),
        RollingConditionBasic::new().max_size(max_bytes),
        retained,
    )?)
}

/// Installs the global subscriber. Must be called once, by the process entry point, which keeps
/// the returned guard alive until it exits so buffered lines reach the file.
pub fn enable_logging(
    prefix: &str,
    log_dir: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<WorkerGuard> {
    let file = log_file(prefix, log_dir, MAX_LOG_FILE_BYTES, RETAINED_LOG_FILES)?;
    let (appender, guard) = tracing_appender::non_blocking(file);

    let stdout = std::io::stdout.with_filter(move |_| show_std);

    let level = log_level
        .map(|v| v.to_string())
        .unwrap_or_else(|| std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(format!(
            "{}={level}",
            env!("CARGO_PKG_NAME").replace("-", "_"),
        )))
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .with_writer(stdout.and(appender))
        .init();
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempdir;

    use super::log_file;

    #[test]
    fn log_file_rotates_by_size_and_keeps_a_bounded_number() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");
        let mut file = log_file("cli", &logs, 100, 2).unwrap();

        let line = [b'x'; 60];
        for _ in 0..10 {
            file.write_all(&line).unwrap();
            file.flush().unwrap();
        }
        drop(file);

        assert!(logs.join("cli.log").exists());
        assert!(logs.join("cli.log.1").exists());
        let files = std::fs::read_dir(&logs).unwrap().count();
        assert!(files <= 3, "kept {files} files");
        for entry in std::fs::read_dir(&logs).unwrap() {
            let size = entry.unwrap().metadata().unwrap().len();
            assert!(size <= 120, "log file grew to {size} bytes");
        }
    }
}
