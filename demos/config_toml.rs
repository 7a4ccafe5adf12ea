//! Example of loading logger configuration from a TOML file.
//!
//! Run with:
//! ```bash
//! cargo run --example config_toml
//! ```

use beanlog::{Destroyable, Level, Properties};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/config.toml");
    let conf = Properties::from_file(config_path)?;
    println!("configured level: {}", conf.get_str("neve.logger.level", "info"));

    // An explicit level wins over the configured one.
    let mut processor = beanlog::builder().with_level(Level::Info).init(&conf)?;

    tracing::debug!("This is a debug message (filtered out)");
    tracing::info!("This is an info message (visible through the override)");
    tracing::error!(
        error_code = 500,
        error_type = "database",
        "Database error occurred"
    );

    processor.destroy()?;
    Ok(())
}
