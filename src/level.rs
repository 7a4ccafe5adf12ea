use std::fmt;
use std::str::FromStr;

use tracing::Event;
use tracing::field::{Field, Visit};

/// Field carrying PANIC or FATAL on an ERROR event.
pub(crate) const SEVERITY: &str = "severity";

/// Severity of a log record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Panic,
    Fatal,
}

impl Level {
    /// Parse a configured level name.
    ///
    /// Returns the level and whether the name was recognized. Empty or unknown
    /// names fall back to [`Level::Info`] with `false`, so callers can tell a
    /// defaulted level apart from an explicit `"info"`.
    pub fn translate(name: &str) -> (Level, bool) {
        match name.parse() {
            Ok(level) => (level, true),
            Err(_) => (Level::Info, false),
        }
    }

    /// Map a `tracing` event level and an optional `severity` tag onto a level.
    ///
    /// `tracing` stops at ERROR, so PANIC and FATAL records are ERROR events
    /// carrying `severity = "panic"` or `severity = "fatal"`.
    pub fn from_event(level: &tracing::Level, severity: Option<&str>) -> Level {
        match *level {
            tracing::Level::ERROR => match severity.map(str::parse::<Level>) {
                Some(Ok(tagged)) if tagged > Level::Error => tagged,
                _ => Level::Error,
            },
            tracing::Level::WARN => Level::Warn,
            tracing::Level::INFO => Level::Info,
            _ => Level::Debug,
        }
    }

    /// Effective level of a recorded event.
    pub fn of(event: &Event<'_>) -> Level {
        let level = event.metadata().level();
        if *level != tracing::Level::ERROR {
            return Level::from_event(level, None);
        }
        let mut visitor = SeverityVisitor(None);
        event.record(&mut visitor);
        Level::from_event(level, visitor.0.as_deref())
    }

    /// Most severe level an event at this callsite level can carry.
    pub(crate) fn ceiling(level: &tracing::Level) -> Level {
        if *level == tracing::Level::ERROR {
            Level::Fatal
        } else {
            Level::from_event(level, None)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Panic => "PANIC",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct SeverityVisitor(Option<String>);

impl Visit for SeverityVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == SEVERITY {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == SEVERITY {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

/// Returned when a level name is not one of the known severities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level: {:?}", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "PANIC" => Ok(Level::Panic),
            "FATAL" => Ok(Level::Fatal),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}
