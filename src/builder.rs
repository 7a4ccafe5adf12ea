//! Builder for the logger processor.
//!
//! Each option replaces exactly one default; options not set keep it.
//!
//! # Example
//!
//! ```rust,no_run
//! use beanlog::{Level, Properties};
//!
//! let conf = Properties::from_yaml_str(
//!     "neve:\n  logger:\n    level: debug\n    file: [stdout, /var/log/app.log]\n",
//! )?;
//!
//! let mut processor = beanlog::builder()
//!     .with_level(Level::Warn)
//!     .init(&conf)?;
//!
//! tracing::warn!("disk almost full");
//! beanlog::Destroyable::destroy(&mut processor)?;
//! # Ok::<(), beanlog::Error>(())
//! ```

use std::sync::Arc;

use tracing_subscriber::fmt::format::FormatEvent;
use tracing_subscriber::registry::Registry;

use crate::format::LineFields;
use crate::output::FileWriter;
use crate::processor::{LoggerProcessor, Processor, ProcessorOptions};
use crate::{Level, Properties, Result};

/// Fluent construction of a [`LoggerProcessor`].
#[derive(Debug, Clone, Default)]
pub struct ProcessorBuilder {
    options: ProcessorOptions,
}

impl ProcessorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(options: ProcessorOptions) -> Self {
        Self { options }
    }

    /// Open file outputs with `factory` instead of the rotating file writer.
    pub fn with_file_writer_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Result<Box<dyn FileWriter>> + Send + Sync + 'static,
    {
        self.options.file_writer_factory = Some(Arc::new(factory));
        self
    }

    /// Fix the severity threshold; the configured level is ignored.
    pub fn with_level(mut self, level: Level) -> Self {
        self.options.level = Some(level);
        self
    }

    /// Render events with `formatter` instead of text lines, for example
    /// [`format::json`](crate::format::json).
    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: FormatEvent<Registry, LineFields> + Send + Sync + 'static,
    {
        self.options.formatter = Some(Arc::new(formatter));
        self
    }

    /// The collected options.
    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    pub fn build(self) -> LoggerProcessor {
        LoggerProcessor::new(self.options)
    }

    /// Build the processor and initialize it from `conf` without a container.
    pub fn init(self, conf: &Properties) -> Result<LoggerProcessor> {
        let mut processor = self.build();
        processor.init(conf, &())?;
        Ok(processor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::format;

    #[test]
    fn test_builder_new() {
        let builder = ProcessorBuilder::new();
        let options = builder.options();
        assert!(options.file_writer_factory.is_none());
        assert!(options.level.is_none());
        assert!(options.formatter.is_none());
    }

    #[test]
    fn test_builder_with_level() {
        let processor = ProcessorBuilder::new().with_level(Level::Debug).build();
        assert_eq!(processor.level(), Level::Debug);
    }

    #[test]
    fn test_builder_with_factory() {
        let builder = ProcessorBuilder::new()
            .with_file_writer_factory(|path| Err(Error::Config(format!("no {path}"))));
        let factory = builder.options().file_writer_factory.clone().unwrap();
        let err = factory("app.log").err().unwrap();
        assert!(err.to_string().contains("no app.log"));
    }

    #[test]
    fn test_builder_chaining() {
        let builder = ProcessorBuilder::new()
            .with_level(Level::Warn)
            .with_formatter(format::json());
        let options = builder.options();
        assert_eq!(options.level, Some(Level::Warn));
        assert!(options.formatter.is_some());
        assert!(options.file_writer_factory.is_none());
    }

    #[test]
    fn test_builder_from_options() {
        let options = ProcessorOptions {
            level: Some(Level::Panic),
            ..Default::default()
        };
        let processor = ProcessorBuilder::from_options(options).build();
        assert_eq!(processor.level(), Level::Panic);
    }
}
