use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// When the host renders relative to queued actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPolicy {
  /// Apply every queued action, then render once.
  #[default]
  Coalesce,
  /// Render after each applied action.
  PerAction,
}

/// Configuration for a workflow host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
  /// Identifies the host in log output.
  pub label: String,
  /// Render scheduling relative to action application.
  pub render_policy: RenderPolicy,
  /// Maximum number of actions applied before a render is forced.
  /// `None` drains the queue completely.
  pub max_batch: Option<usize>,
}

impl Default for HostConfig {
  fn default() -> Self {
    Self {
      label: "workflow".to_string(),
      render_policy: RenderPolicy::default(),
      max_batch: None,
    }
  }
}

impl HostConfig {
  /// Create a config with the given label and default settings.
  pub fn labeled(label: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      ..Self::default()
    }
  }

  /// Parse a config from a JSON string. Missing fields take their defaults.
  pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
    let config: Self = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
  }

  /// Load a config from a JSON file.
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.display().to_string(),
      source,
    })?;
    Self::from_json_str(&content)
  }

  /// Number of actions to apply per render pass.
  ///
  /// `PerAction` always yields one; otherwise `max_batch` or unbounded.
  pub fn batch_limit(&self) -> usize {
    match self.render_policy {
      RenderPolicy::PerAction => 1,
      RenderPolicy::Coalesce => self.max_batch.unwrap_or(usize::MAX),
    }
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.max_batch == Some(0) {
      return Err(ConfigError::Invalid {
        field: "max_batch".to_string(),
        message: "must be at least 1".to_string(),
      });
    }
    Ok(())
  }
}
