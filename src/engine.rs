//! The logging engine: one immutable snapshot of every logger setting.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::span::{Attributes, Id, Record};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::Registry;

use crate::Level;
use crate::caller::{self, CallerFlags, CallerFormatter};
use crate::format::{LineFields, LineFormat, SharedFormatter};
use crate::output::{Destination, FanOut};

type FmtLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// A fully configured logger.
///
/// Engines are built with the `with_*` methods and never change once
/// installed; reconfiguring means building a new engine and swapping it in.
/// Events reach the engine as a [`Layer`] on the registry, which filters by
/// threshold and hands the rest to a `fmt` layer writing to the outputs.
pub struct Engine {
    level: Level,
    caller_flags: CallerFlags,
    caller_format: CallerFormatter,
    no_fatal_trace: bool,
    simple_name: bool,
    formatter: Option<SharedFormatter>,
    output: FanOut,
    default_output: bool,
    layer: OnceCell<FmtLayer>,
}

impl Engine {
    pub fn new(
        caller_flags: CallerFlags,
        caller_format: CallerFormatter,
        no_fatal_trace: bool,
    ) -> Self {
        Self {
            level: Level::Info,
            caller_flags,
            caller_format,
            no_fatal_trace,
            simple_name: false,
            formatter: None,
            output: FanOut::new(vec![Destination::Stdout]),
            default_output: true,
            layer: OnceCell::new(),
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Replace the text line format.
    pub fn with_formatter(mut self, formatter: SharedFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Replace the default stdout output.
    pub fn with_output(mut self, output: FanOut) -> Self {
        self.output = output;
        self.default_output = false;
        self
    }

    pub fn with_simple_name(mut self, simple_name: bool) -> Self {
        self.simple_name = simple_name;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn caller_flags(&self) -> CallerFlags {
        self.caller_flags
    }

    pub fn no_fatal_trace(&self) -> bool {
        self.no_fatal_trace
    }

    pub fn simple_name(&self) -> bool {
        self.simple_name
    }

    pub fn output(&self) -> &FanOut {
        &self.output
    }

    /// True while the engine still writes to its built-in stdout output.
    pub fn has_default_output(&self) -> bool {
        self.default_output
    }

    /// Callsite check; an ERROR callsite may still carry PANIC or FATAL.
    pub fn is_enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_span() || Level::ceiling(metadata.level()) >= self.level
    }

    /// Event check, with the `severity` tag resolved.
    pub fn admits(&self, event: &Event<'_>) -> bool {
        Level::of(event) >= self.level
    }

    pub fn flush(&self) {
        let _ = self.output.flush();
    }

    fn fmt_layer(&self) -> &FmtLayer {
        self.layer.get_or_init(|| {
            let format = LineFormat::new(self.caller_flags, Arc::clone(&self.caller_format))
                .with_simple_name(self.simple_name)
                .with_no_fatal_trace(self.no_fatal_trace)
                .with_custom(self.formatter.clone());
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .fmt_fields(LineFields)
                .event_format(format)
                .with_writer(self.output.clone())
                .boxed()
        })
    }
}

impl Default for Engine {
    /// INFO, short file names, text lines on stdout.
    fn default() -> Self {
        Self::new(CallerFlags::SHORT_FILE, Arc::new(caller::format_caller), false)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("level", &self.level)
            .field("caller_flags", &self.caller_flags)
            .field("no_fatal_trace", &self.no_fatal_trace)
            .field("simple_name", &self.simple_name)
            .field("formatter", &self.formatter.is_some())
            .field("output", &self.output)
            .field("default_output", &self.default_output)
            .finish_non_exhaustive()
    }
}

impl Layer<Registry> for Engine {
    // The threshold changes at runtime, so callsites must not be cached.
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, Registry>) -> bool {
        self.is_enabled(metadata)
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, Registry>) {
        self.fmt_layer().on_new_span(attrs, id, ctx);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, Registry>) {
        self.fmt_layer().on_record(id, values, ctx);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, Registry>) {
        if self.admits(event) {
            self.fmt_layer().on_event(event, ctx);
        }
    }
}
