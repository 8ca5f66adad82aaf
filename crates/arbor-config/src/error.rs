use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file '{path}'")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("invalid config: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("invalid config value for '{field}': {message}")]
  Invalid { field: String, message: String },
}
