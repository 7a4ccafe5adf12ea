//! Example of loading logger configuration from a YAML file.
//!
//! Run with:
//! ```bash
//! cargo run --example config_yaml
//! ```

use beanlog::{Destroyable, LoggerProcessor, Processor, Properties};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/config.yaml");
    let conf = Properties::from_file(config_path)?;

    // The duplicate stdout entry is written to once.
    let mut processor = LoggerProcessor::default();
    processor.init(&conf, &())?;

    tracing::trace!("This is a trace message (reported as DEBUG)");
    tracing::debug!("This is a debug message");
    tracing::info!("This is an info message");

    let span = tracing::info_span!("checkout", order = 42);
    let _enter = span.enter();
    tracing::info!(user = "alice", action = "pay", "User performed an action");
    tracing::warn!(error_code = 404, path = "/api/users", "Resource not found");

    processor.destroy()?;
    Ok(())
}
