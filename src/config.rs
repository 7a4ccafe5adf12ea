use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::{Error, Result};

/// Key of the logger block inside the application configuration.
pub const CONFIG_KEY: &str = "neve.logger";

/// Logger block of the application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Severity threshold name (DEBUG, INFO, WARN, ERROR, PANIC, FATAL)
    #[serde(default)]
    pub level: Option<String>,
    /// Outputs: "stdout", "stderr" or a file path, in order
    #[serde(default)]
    pub file: Vec<String>,
    /// Caller display settings
    #[serde(default)]
    pub caller: CallerConfig,
    /// Abbreviate logger display names
    #[serde(default)]
    pub simple_name: bool,
    /// Skip the backtrace attached to FATAL records
    #[serde(default)]
    pub no_fatal_trace: bool,
}

impl LoggerConfig {
    /// Create a new LoggerConfig with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Append an output destination
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.file.push(output.into());
        self
    }

    /// Set the caller display settings
    pub fn with_caller(mut self, file: impl Into<String>, func: impl Into<String>) -> Self {
        self.caller = CallerConfig {
            file: file.into(),
            func: func.into(),
        };
        self
    }

    /// Abbreviate logger display names
    pub fn with_simple_name(mut self, simple_name: bool) -> Self {
        self.simple_name = simple_name;
        self
    }

    /// Skip backtraces on FATAL records
    pub fn with_no_fatal_trace(mut self, no_fatal_trace: bool) -> Self {
        self.no_fatal_trace = no_fatal_trace;
        self
    }
}

/// Caller display settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerConfig {
    /// "none", "short" or "long"
    #[serde(default = "default_caller_file")]
    pub file: String,
    /// "none", "short", "long" or "simple"
    #[serde(default = "default_caller_func")]
    pub func: String,
}

impl Default for CallerConfig {
    fn default() -> Self {
        Self {
            file: default_caller_file(),
            func: default_caller_func(),
        }
    }
}

fn default_caller_file() -> String {
    "short".to_string()
}

fn default_caller_func() -> String {
    "none".to_string()
}

/// Parsed application configuration with dotted-key lookup.
///
/// YAML and TOML documents are both held as a YAML value tree, so
/// `neve.logger.level` resolves the same way for either format.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    root: Value,
}

impl Properties {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(Self::from_value(serde_yaml::from_str(s)?))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let doc: toml::Value = toml::from_str(s)?;
        Ok(Self::from_value(serde_yaml::to_value(doc)?))
    }

    /// Load a configuration file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            other => Err(Error::Config(format!(
                "unsupported configuration format: {:?}",
                other.unwrap_or("")
            ))),
        }
    }

    /// Look up a dotted key such as `neve.logger.file`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .filter(|part| !part.is_empty())
            .try_fold(&self.root, |node, part| node.get(part))
    }

    /// Deserialize the value at `key`.
    pub fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .get(key)
            .ok_or_else(|| Error::Config(format!("missing configuration key: {}", key)))?;
        serde_yaml::from_value(value.clone())
            .map_err(|e| Error::Config(format!("invalid value for {}: {}", key, e)))
    }

    /// String value at `key`, or `default` when absent or not a scalar.
    pub fn get_str(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => default.to_string(),
        }
    }
}
