//! # Beanlog
//!
//! Configures the process-wide logger from a declarative configuration block
//! at application startup, and releases the files it opened at shutdown.
//!
//! ## Features
//!
//! - `neve.logger` configuration block in YAML or TOML
//! - Output fan-out to `stdout`, `stderr` and daily rotated, gzipped files
//! - Severity threshold with PANIC and FATAL levels above ERROR
//! - Caller display (file and function) in short, long or compressed form
//! - Atomic reconfiguration: log calls see either the old logger or the new one
//! - Integration with the `tracing` ecosystem
//!
//! ## Example
//!
//! ```rust,no_run
//! use beanlog::{Destroyable, LoggerProcessor, Processor, Properties};
//!
//! let conf = Properties::from_yaml_str(
//!     "neve:\n  logger:\n    level: info\n    file: [stdout, logs/app.log]\n",
//! )?;
//!
//! let mut processor = LoggerProcessor::default();
//! processor.init(&conf, &())?;
//!
//! tracing::info!("This is an info message");
//!
//! processor.destroy()?;
//! # Ok::<(), beanlog::Error>(())
//! ```

pub mod builder;
pub mod caller;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod global;
pub mod level;
pub mod output;
pub mod processor;
pub mod rotation;
pub mod translate;

#[cfg(feature = "file")]
pub mod writer;

mod macros;

pub use builder::ProcessorBuilder;
pub use caller::{CallerFlags, CallerFormatter, FileMode, FuncMode};
pub use config::{CONFIG_KEY, CallerConfig, LoggerConfig, Properties};
pub use engine::Engine;
pub use error::{Error, Result};
pub use format::{LineFields, LineFormat, SharedFormatter};
pub use global::{active, flush, install, layer};
pub use level::Level;
pub use output::{Destination, FanOut, FanOutWriter, FileWriter, FileWriterFactory, OwnedFile};
pub use processor::{Container, Destroyable, LoggerProcessor, Processor, ProcessorOptions};
pub use rotation::{RotationPeriod, RotationPolicy};

#[cfg(feature = "file")]
pub use writer::{BufferedFile, RotatingFile};

/// Start building a [`LoggerProcessor`].
pub fn builder() -> ProcessorBuilder {
    ProcessorBuilder::new()
}

#[doc(hidden)]
pub mod __private {
    pub use tracing;

    /// Drain and close the active engine's files, then exit with status 1.
    pub fn exit_fatal() -> ! {
        let engine = crate::global::active();
        let _ = engine.output().close_files();
        engine.flush();
        std::process::exit(1)
    }
}
