use std::path::Path;

use flexi_logger::{
    Cleanup, Criterion, DeferredNow, Duplicate, FileSpec, Logger, LoggerHandle, Naming,
    WriteMode,
};
use log::Record;

use crate::config::LoggingConfig;
use crate::error::EnsGuardError;

const LOG_BASENAME: &str = "ensguard";
const LOG_ROTATE_BYTES: u64 = 5 * 1024 * 1024;
const LOG_FILES_KEPT: usize = 5;

/// Starts file logging under `<data_dir>/logs`. The returned handle must be
/// held for the life of the process or buffered output is lost.
pub fn init_logging(data_dir: &Path, config: &LoggingConfig) -> Result<LoggerHandle, EnsGuardError> {
    let handle = Logger::try_with_str(config.log_spec())?
        .log_to_file(
            FileSpec::default()
                .directory(data_dir.join("logs"))
                .basename(LOG_BASENAME),
        )
        .rotate(
            Criterion::Size(LOG_ROTATE_BYTES),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(LOG_FILES_KEPT),
        )
        .format_for_files(log_format)
        .duplicate_to_stderr(Duplicate::Warn)
        .write_mode(WriteMode::BufferAndFlush)
        .start()?;

    Ok(handle)
}

fn log_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} {:<5} [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S%.3f"),
        record.level(),
        record.module_path().unwrap_or("<unnamed>"),
        record.args()
    )
}
