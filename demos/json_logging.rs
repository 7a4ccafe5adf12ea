//! JSON structured logging example.
//!
//! Swaps the text line format for one JSON object per record.

use beanlog::{Destroyable, LoggerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut processor = beanlog::builder()
        .with_formatter(beanlog::format::json())
        .build();

    let config = LoggerConfig::new()
        .with_level("info")
        .with_output("stdout")
        .with_caller("short", "none");
    processor.configure(&config)?;

    tracing::info!(user_id = 123, action = "login", "User logged in");
    tracing::warn!(error_code = 404, "Resource not found");

    let result = std::panic::catch_unwind(|| {
        beanlog::log_panic!("unreachable state: {}", "demo");
    });
    assert!(result.is_err());

    processor.destroy()?;
    Ok(())
}
