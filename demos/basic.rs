//! Basic logging example.
//!
//! Configures the logger from an inline YAML block and logs to stdout.

use beanlog::{Destroyable, Properties};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let conf = Properties::from_yaml_str(
        r#"
neve:
  logger:
    level: info
    file: [stdout]
    caller:
      file: short
      func: short
"#,
    )?;

    let mut processor = beanlog::builder().init(&conf)?;

    tracing::debug!("This is a debug message (filtered out)");
    tracing::info!("This is an info message");
    tracing::warn!("This is a warning message");
    tracing::error!("This is an error message");

    processor.destroy()?;
    Ok(())
}
