use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading a machine document.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read machine file {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("unsupported machine file extension: {}", .path.display())]
  UnsupportedFormat { path: PathBuf },

  #[error("invalid YAML: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("invalid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("machine document must be a mapping at the top level")]
  NotAMapping,
}
