//! Logging to stderr.
//!
//! This module provides a minimal [`log`] backend for the `vtsession` binary.
//! Messages at `info` and above are always printed; `debug` messages only when
//! the `DEBUG` environment variable is set or verbose output was requested.

use std::env;

use log::{Level, LevelFilter, Log, Metadata, Record};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let message = record.args().to_string();
            eprintln!("{}", format_record(record.level(), &message));
        }
    }

    fn flush(&self) {}
}

fn format_record(level: Level, message: &str) -> String {
    format!("[{}] {message}", level.as_str().to_lowercase())
}

/// Level filter for the given verbosity.
///
/// # Arguments
///
/// * `verbose` - Whether debug output was explicitly requested
#[must_use]
pub fn level_filter(verbose: bool) -> LevelFilter {
    if verbose || env::var("DEBUG").is_ok() {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Install the stderr logger.
///
/// Calling this more than once only updates the level.
///
/// # Arguments
///
/// * `verbose` - Whether debug output was explicitly requested
pub fn init(verbose: bool) {
    // already installed is fine, the level below still applies
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level_filter(verbose));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_dont_panic() {
        // These should not panic regardless of DEBUG setting
        init(false);
        init(true);
        log::debug!("Test debug message");
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter(true), LevelFilter::Debug);
    }

    #[test]
    fn test_format_record() {
        assert_eq!(format_record(Level::Warn, "vt gone"), "[warn] vt gone");
        assert_eq!(
            format_record(Level::Info, "Running on vt 7"),
            "[info] Running on vt 7"
        );
    }
}
