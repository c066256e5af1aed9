use std::{fmt::Display, io::Write, path::Path};

use env_logger::{Builder, Env, Target};
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate, TimeFrequency,
};

/// Name of the active log file inside the log directory.
pub const LOG_FILE: &str = "app.log";

/// Number of rotated files kept next to the active one.
pub const LOG_BACKUPS: usize = 7;

/// Write one record as `<timestamp> - <target> - <LEVEL> - <message>`.
pub fn write_record(
    out: &mut dyn Write,
    timestamp: impl Display,
    record: &log::Record,
) -> std::io::Result<()> {
    writeln!(
        out,
        "{} - {} - {} - {}",
        timestamp,
        record.target(),
        record.level(),
        record.args()
    )
}

/// The daily rotated `<log_dir>/app.log` keeping [`LOG_BACKUPS`] old files.
pub fn rotating_writer(log_dir: &Path) -> FileRotate<AppendTimestamp> {
    FileRotate::new(
        log_dir.join(LOG_FILE),
        AppendTimestamp::default(FileLimit::MaxFiles(LOG_BACKUPS)),
        ContentLimit::Time(TimeFrequency::Daily),
        Compression::None,
        #[cfg(unix)]
        None,
    )
}

/// Attach the process-wide logger writing to `<log_dir>/app.log`.
///
/// `RUST_LOG` takes precedence over `level`. Calling it again is a no-op.
pub fn init(log_dir: &Path, level: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let writer = rotating_writer(log_dir);

    let mut builder = Builder::from_env(Env::default().default_filter_or(level));
    builder
        .format(|buf, record| {
            let timestamp = buf.timestamp_millis();
            write_record(buf, timestamp, record)
        })
        .target(Target::Pipe(Box::new(writer)));

    if builder.try_init().is_err() {
        log::debug!("logger already initialized");
    }
    Ok(())
}
