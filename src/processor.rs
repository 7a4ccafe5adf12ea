//! The logger processor and the lifecycle hooks a container drives.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::config::{CONFIG_KEY, LoggerConfig, Properties};
use crate::engine::Engine;
use crate::format::SharedFormatter;
use crate::output::{self, FanOut, FileWriter, FileWriterFactory, OwnedFile};
use crate::{Level, Result, global, translate};

/// Opaque handle to the component container that drives processor
/// lifecycles. The logger processor does not look into it.
pub trait Container: Send + Sync {}

/// No container at all, for standalone use.
impl Container for () {}

/// Startup hooks a container calls on a processor.
pub trait Processor {
    /// Called once with the application configuration.
    fn init(&mut self, conf: &Properties, container: &dyn Container) -> Result<()>;

    /// Offered every component; returns whether this processor takes it.
    fn classify(&mut self, bean: &dyn Any) -> Result<bool>;

    /// Called after classification.
    fn process(&mut self) -> Result<()>;
}

/// Shutdown hook.
pub trait Destroyable {
    fn destroy(&mut self) -> Result<()>;
}

/// Construction-time overrides. Each field replaces exactly one default.
#[derive(Clone, Default)]
pub struct ProcessorOptions {
    /// Opens file destinations. Default: [`output::default_factory`].
    pub file_writer_factory: Option<FileWriterFactory>,
    /// Fixed severity threshold. Default: the configured level.
    pub level: Option<Level>,
    /// Event format. Default: [`LineFormat`](crate::LineFormat) text lines.
    pub formatter: Option<SharedFormatter>,
}

impl fmt::Debug for ProcessorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorOptions")
            .field("file_writer_factory", &self.file_writer_factory.is_some())
            .field("level", &self.level)
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

/// Configures the global logger from the `neve.logger` block and owns the
/// files it opens until teardown.
pub struct LoggerProcessor {
    owned: Vec<OwnedFile>,
    factory: FileWriterFactory,
    level_override: Option<Level>,
    level: Level,
    formatter: Option<SharedFormatter>,
}

impl LoggerProcessor {
    pub fn new(options: ProcessorOptions) -> Self {
        Self {
            owned: Vec::new(),
            factory: options
                .file_writer_factory
                .unwrap_or_else(output::default_factory),
            level_override: options.level,
            level: options.level.unwrap_or_default(),
            formatter: options.formatter,
        }
    }

    pub fn builder() -> crate::ProcessorBuilder {
        crate::ProcessorBuilder::new()
    }

    /// Effective severity threshold.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Files opened by this processor and not yet released.
    pub fn owned_files(&self) -> &[OwnedFile] {
        &self.owned
    }

    /// Translate `config`, open its outputs and install the resulting engine.
    ///
    /// On an output failure nothing is installed, files opened by this call
    /// are closed again and the error is returned.
    pub fn configure(&mut self, config: &LoggerConfig) -> Result<Arc<Engine>> {
        let settings = translate::translate(config);
        let level = self.level_override.unwrap_or(settings.level);

        let resolved = output::resolve(&config.file, &self.factory).inspect_err(|e| {
            tracing::error!(error = %e, "resolve log outputs failed");
        })?;

        let mut engine = Engine::new(
            settings.caller_flags,
            settings.caller_format,
            settings.no_fatal_trace,
        )
        .with_level(level)
        .with_simple_name(settings.simple_name);
        if let Some(formatter) = &self.formatter {
            engine = engine.with_formatter(Arc::clone(formatter));
        }
        // An empty output list keeps the default output rather than
        // installing a sink that writes nowhere.
        if !resolved.writers.is_empty() {
            engine = engine.with_output(FanOut::new(resolved.writers));
        }

        self.level = level;
        self.owned.extend(resolved.owned);
        let engine = global::install(engine);
        tracing::debug!(
            level = %level,
            outputs = engine.output().len(),
            files = self.owned.len(),
            "logger installed"
        );
        Ok(engine)
    }

    /// Close every owned file, keeping the last close error.
    ///
    /// The owned list is empty afterwards whatever the outcome, so a second
    /// call does nothing.
    pub fn release_all(&mut self) -> Result<()> {
        let result = output::close_all(&self.owned);
        self.owned.clear();
        result
    }
}

impl Default for LoggerProcessor {
    fn default() -> Self {
        Self::new(ProcessorOptions::default())
    }
}

impl fmt::Debug for LoggerProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerProcessor")
            .field("owned", &self.owned)
            .field("level_override", &self.level_override)
            .field("level", &self.level)
            .field("formatter", &self.formatter.is_some())
            .finish_non_exhaustive()
    }
}

impl Processor for LoggerProcessor {
    /// A missing or malformed logger block is logged and skipped so the
    /// application still boots with the logging it already has.
    fn init(&mut self, conf: &Properties, _container: &dyn Container) -> Result<()> {
        let config: LoggerConfig = match conf.get_value(CONFIG_KEY) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Get logger config failed.");
                return Ok(());
            }
        };
        self.configure(&config).map(|_| ())
    }

    fn classify(&mut self, _bean: &dyn Any) -> Result<bool> {
        Ok(false)
    }

    fn process(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Destroyable for LoggerProcessor {
    fn destroy(&mut self) -> Result<()> {
        self.release_all()
    }
}

/// Wrap a closure as a [`FileWriterFactory`].
pub fn file_writer_factory<F>(factory: F) -> FileWriterFactory
where
    F: Fn(&str) -> Result<Box<dyn FileWriter>> + Send + Sync + 'static,
{
    Arc::new(factory)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let processor = LoggerProcessor::default();
        assert_eq!(processor.level(), Level::Info);
        assert!(processor.owned_files().is_empty());
        assert_eq!(processor.level_override, None);
    }

    #[test]
    fn test_level_override_is_effective_immediately() {
        let processor = LoggerProcessor::new(ProcessorOptions {
            level: Some(Level::Error),
            ..Default::default()
        });
        assert_eq!(processor.level(), Level::Error);
    }

    #[test]
    fn test_extension_points_are_noops() {
        let mut processor = LoggerProcessor::default();
        assert!(!processor.classify(&42u32).unwrap());
        assert!(!processor.classify(&"bean").unwrap());
        processor.process().unwrap();
    }

    #[test]
    fn test_release_without_files() {
        let mut processor = LoggerProcessor::default();
        processor.release_all().unwrap();
        processor.destroy().unwrap();
    }

    #[test]
    fn test_options_debug_hides_closures() {
        let options = ProcessorOptions {
            file_writer_factory: Some(file_writer_factory(|path| {
                Err(crate::Error::Config(path.to_string()))
            })),
            ..Default::default()
        };
        let text = format!("{:?}", options);
        assert!(text.contains("file_writer_factory: true"));
        assert!(text.contains("formatter: false"));
    }
}
