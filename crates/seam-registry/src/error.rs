use std::path::PathBuf;

use seam_config::ConfigError;
use seam_validator::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("failed to read machine directory {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to load machine file {}: {source}", .path.display())]
  Config {
    path: PathBuf,
    #[source]
    source: ConfigError,
  },

  #[error("machine file {} is invalid: {source}", .path.display())]
  Invalid {
    path: PathBuf,
    #[source]
    source: ValidationError,
  },

  #[error("machine '{name}' is defined more than once")]
  DuplicateMachine { name: String },
}
