use chrono::Local;
use colored::Colorize;
use fern::Dispatch;
use log::LevelFilter;
use std::fs::{create_dir_all, OpenOptions};
use std::path::Path;

/// Maps a textual level to a filter. Unknown levels fall back to `Info`.
pub fn parse_level(log_level: &str) -> LevelFilter {
    match log_level.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

fn format_line(out: fern::FormatCallback, message: &std::fmt::Arguments, record: &log::Record) {
    let level_str = match record.level() {
        log::Level::Error => "ERROR".red(),
        log::Level::Warn => "WARN".yellow(),
        log::Level::Info => "INFO".green(),
        log::Level::Debug => "DEBUG".cyan(),
        log::Level::Trace => "TRACE".normal(),
    };

    out.finish(format_args!(
        "[{}][{}][{}] {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        level_str,
        record.target(),
        message
    ))
}

/// Builds the dispatch that writes to stdout and appends to `log_file_path`, creating the
/// file's directory when needed.
pub fn build_dispatch(log_level: &str, log_file_path: &str) -> Result<Dispatch, fern::InitError> {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            create_dir_all(parent)?;
        }
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    Ok(Dispatch::new()
        .format(format_line)
        .level(parse_level(log_level))
        .chain(std::io::stdout())
        .chain(log_file))
}

/// Installs the global logger. Fails if one is already installed.
pub fn init_logger(log_level: &str, log_file_path: &str) -> Result<(), fern::InitError> {
    build_dispatch(log_level, log_file_path)?.apply()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_known_and_fallback() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(parse_level(" warn "), LevelFilter::Warn);
        assert_eq!(parse_level("verbose"), LevelFilter::Info);
    }

    #[test]
    fn test_build_dispatch_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("nested/logs/grader.log");

        build_dispatch("debug", log_path.to_str().unwrap()).unwrap();

        assert!(log_path.exists());
    }
}
