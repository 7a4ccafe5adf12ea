//! Event formats plugged into the engine's `fmt` layer.

use std::backtrace::Backtrace;
use std::fmt::{self, Write as _};
use std::sync::Arc;

use time::UtcOffset;
use time::format_description::well_known::Rfc3339;
use tracing::Event;
use tracing::field::{Field, Visit};
use tracing_subscriber::field::{RecordFields, VisitOutput};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{
    DefaultVisitor, Format, FormatEvent, FormatFields, Json, Writer,
};
use tracing_subscriber::fmt::time::{FormatTime, OffsetTime};
use tracing_subscriber::registry::Registry;

use crate::Level;
use crate::caller::{self, CallerFlags, CallerFormatter};
use crate::level::SEVERITY;

/// A replacement event format for the engine's `fmt` layer.
pub type SharedFormatter = Arc<dyn FormatEvent<Registry, LineFields> + Send + Sync>;

/// RFC 3339 timestamps in the local offset, UTC when the offset is unknown.
pub fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

/// One JSON object per record.
///
/// Span fields are left out: spans may be recorded by an engine that was
/// installed before this one.
pub fn json() -> Format<Json, OffsetTime<Rfc3339>> {
    tracing_subscriber::fmt::format()
        .json()
        .with_timer(local_timer())
        .with_current_span(false)
        .with_span_list(false)
}

/// Field rendering for text lines: the message, then `key=value` pairs.
///
/// The `severity` tag already shows as the level and is not repeated.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFields;

impl<'writer> FormatFields<'writer> for LineFields {
    fn format_fields<R: RecordFields>(&self, writer: Writer<'writer>, fields: R) -> fmt::Result {
        let mut visitor = SkipSeverity(DefaultVisitor::new(writer, true));
        fields.record(&mut visitor);
        visitor.0.finish()
    }
}

struct SkipSeverity<'a>(DefaultVisitor<'a>);

impl Visit for SkipSeverity<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() != SEVERITY {
            self.0.record_str(field, value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() != SEVERITY {
            self.0.record_debug(field, value);
        }
    }
}

/// The engine's event format.
///
/// Text lines look like
/// `2026-01-09T10:00:00+01:00 WARN  app::net [request]: message key=value src/net.rs:42`.
/// With a replacement format the line is left to it. Either way FATAL
/// records are followed by a backtrace unless that is switched off.
pub struct LineFormat {
    timer: OffsetTime<Rfc3339>,
    caller_flags: CallerFlags,
    caller_format: CallerFormatter,
    simple_name: bool,
    no_fatal_trace: bool,
    custom: Option<SharedFormatter>,
}

impl LineFormat {
    pub fn new(caller_flags: CallerFlags, caller_format: CallerFormatter) -> Self {
        Self {
            timer: local_timer(),
            caller_flags,
            caller_format,
            simple_name: false,
            no_fatal_trace: false,
            custom: None,
        }
    }

    pub fn with_simple_name(mut self, simple_name: bool) -> Self {
        self.simple_name = simple_name;
        self
    }

    pub fn with_no_fatal_trace(mut self, no_fatal_trace: bool) -> Self {
        self.no_fatal_trace = no_fatal_trace;
        self
    }

    pub fn with_custom(mut self, custom: Option<SharedFormatter>) -> Self {
        self.custom = custom;
        self
    }

    fn format_text(
        &self,
        ctx: &FmtContext<'_, Registry, LineFields>,
        writer: &mut Writer<'_>,
        event: &Event<'_>,
        level: Level,
    ) -> fmt::Result {
        let metadata = event.metadata();
        self.timer.format_time(writer)?;
        write!(writer, " {:<5} ", level.as_str())?;
        if self.simple_name {
            writer.write_str(&caller::compress_path(metadata.target()))?;
        } else {
            writer.write_str(metadata.target())?;
        }

        if let Some(scope) = ctx.event_scope() {
            let spans: Vec<&str> = scope.from_root().map(|span| span.name()).collect();
            if !spans.is_empty() {
                write!(writer, " [{}]", spans.join(":"))?;
            }
        }

        writer.write_str(": ")?;
        ctx.format_fields(writer.by_ref(), event)?;

        let caller = caller::render(self.caller_flags, &self.caller_format, metadata);
        if !caller.is_empty() {
            write!(writer, " {}", caller)?;
        }
        writeln!(writer)
    }
}

impl FormatEvent<Registry, LineFields> for LineFormat {
    fn format_event(
        &self,
        ctx: &FmtContext<'_, Registry, LineFields>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = Level::of(event);
        match &self.custom {
            Some(custom) => custom.format_event(ctx, writer.by_ref(), event)?,
            None => self.format_text(ctx, &mut writer, event, level)?,
        }

        if level == Level::Fatal && !self.no_fatal_trace {
            let trace = Backtrace::force_capture().to_string();
            writer.write_str(&trace)?;
            if !trace.ends_with('\n') {
                writeln!(writer)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for LineFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineFormat")
            .field("caller_flags", &self.caller_flags)
            .field("simple_name", &self.simple_name)
            .field("no_fatal_trace", &self.no_fatal_trace)
            .field("custom", &self.custom.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::Capture;
    use tracing_subscriber::layer::SubscriberExt;

    fn render(format: LineFormat, f: impl FnOnce()) -> String {
        let out = Capture::default();
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .fmt_fields(LineFields)
            .event_format(format)
            .with_writer(out.clone());
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);
        out.text()
    }

    fn plain() -> LineFormat {
        LineFormat::new(CallerFlags::NONE, Arc::new(caller::format_caller))
    }

    #[test]
    fn test_text_line_layout() {
        let line = render(plain(), || {
            tracing::warn!(target: "app::net", user = "alice", attempts = 3, "login failed")
        });
        let (stamp, rest) = line.split_once(' ').unwrap();
        assert!(stamp.starts_with("20"));
        assert!(stamp.contains('T'));
        assert_eq!(rest, "WARN  app::net: login failed user=\"alice\" attempts=3\n");
    }

    #[test]
    fn test_severity_tag_becomes_level() {
        let line = render(plain().with_no_fatal_trace(true), || {
            tracing::error!(severity = "panic", "gone")
        });
        assert!(line.contains(" PANIC "));
        assert!(line.ends_with(": gone\n"));
        assert!(!line.contains("severity"));
    }

    #[test]
    fn test_spans_and_caller() {
        let format = LineFormat::new(CallerFlags::SHORT_FILE, Arc::new(caller::format_caller));
        let line = render(format, || {
            let outer = tracing::info_span!("request");
            let _outer = outer.enter();
            let inner = tracing::info_span!("db");
            let _inner = inner.enter();
            tracing::info!("query");
        });
        assert!(line.contains(" [request:db]: query format.rs:"));
    }

    #[test]
    fn test_fatal_backtrace() {
        let with_trace = render(plain(), || tracing::error!(severity = "fatal", "boom"));
        let without = render(plain().with_no_fatal_trace(true), || {
            tracing::error!(severity = "fatal", "boom")
        });
        assert_eq!(without.lines().count(), 1);
        assert!(with_trace.lines().count() > 1);
    }

    #[test]
    fn test_json_replacement() {
        let format = plain().with_custom(Some(Arc::new(json())));
        let line = render(format, || tracing::info!(order = 42, "shipped"));
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["fields"]["message"], "shipped");
        assert_eq!(value["fields"]["order"], 42);
    }
}
