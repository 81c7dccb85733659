//! Terminal and session file logging

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use std::fmt::Arguments;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Library targets whose trace output is per geometry evaluation, capped at `Debug`.
const CHATTY_TARGETS: [&str; 2] = ["rm_lib", "road_net"];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The minimum log level must allow at least INFO, found {0}")]
    LevelTooHigh(LevelFilter),

    #[error("Cannot open the session log file: {0}")]
    LogFile(std::io::Error),

    #[error("A logger has already been installed: {0}")]
    AlreadyInstalled(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Install the global logger, writing to stdout and the session's log file.
///
/// `min_level` must be `Info` or more verbose. Only the first call in a process succeeds.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::LevelTooHigh(min_level));
    }

    let log_file = fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFile)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}", format_line(message, record)))
        })
        .level(min_level);

    for target in CHATTY_TARGETS.iter() {
        dispatch = dispatch.level_for(*target, min_level.min(LevelFilter::Debug));
    }

    dispatch
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::AlreadyInstalled)?;

    info!("Logging to {:?} at {:?}", session.log_file_path, min_level);
    if let Some(epoch) = session::get_epoch() {
        info!("Session started {}", epoch);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// `[elapsed LVL] message`, with the record's target for debug and trace lines.
fn format_line(message: &Arguments, record: &Record) -> String {
    let elapsed = session::get_elapsed_seconds();
    let tag = level_tag(record.level());

    match record.level() {
        Level::Debug | Level::Trace => {
            format!("[{:10.6} {}] {}: {}", elapsed, tag, record.target(), message)
        }
        _ => format!("[{:10.6} {}] {}", elapsed, tag, message),
    }
}

fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Error => "ERR".red().bold(),
        Level::Warn => "WRN".yellow(),
        Level::Info => "INF".normal(),
        Level::Debug => "DBG".dimmed(),
        Level::Trace => "TRC".dimmed().italic(),
    }
}
