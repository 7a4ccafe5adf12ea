//! Turns a raw [`LoggerConfig`] into typed engine settings.

use std::fmt;

use crate::caller::{self, CallerFlags, CallerFormatter, FileMode, FuncMode};
use crate::{Level, LoggerConfig};

/// Typed logger settings derived from configuration.
#[derive(Clone)]
pub struct Settings {
    pub level: Level,
    /// False when the configured level was empty or unrecognized.
    pub level_explicit: bool,
    pub caller_flags: CallerFlags,
    pub caller_format: CallerFormatter,
    pub simple_name: bool,
    pub no_fatal_trace: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("level", &self.level)
            .field("level_explicit", &self.level_explicit)
            .field("caller_flags", &self.caller_flags)
            .field("simple_name", &self.simple_name)
            .field("no_fatal_trace", &self.no_fatal_trace)
            .finish_non_exhaustive()
    }
}

pub fn translate(config: &LoggerConfig) -> Settings {
    let (level, level_explicit) = Level::translate(config.level.as_deref().unwrap_or(""));
    let file_mode = FileMode::parse(&config.caller.file);
    let func_mode = FuncMode::parse(&config.caller.func);

    Settings {
        level,
        level_explicit,
        caller_flags: file_mode.flags() | func_mode.flags(),
        caller_format: caller::caller_formatter(func_mode),
        simple_name: config.simple_name,
        no_fatal_trace: config.no_fatal_trace,
    }
}
