use std::path::Path;

use serde_json::Value;

use crate::error::ConfigError;

/// Text formats a machine document can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
  Yaml,
  Json,
}

impl DocumentFormat {
  /// Pick a format from a file extension, if it is one we read.
  pub fn from_path(path: &Path) -> Option<Self> {
    match path.extension().and_then(|e| e.to_str()) {
      Some("yml") | Some("yaml") => Some(Self::Yaml),
      Some("json") => Some(Self::Json),
      _ => None,
    }
  }
}

/// A raw, unvalidated machine document.
///
/// The document is kept untyped until the validator has looked at its
/// `version`, since each version has its own schema.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineDocument {
  value: Value,
}

impl MachineDocument {
  /// Wrap an already parsed value. The value must be a mapping.
  pub fn from_value(value: Value) -> Result<Self, ConfigError> {
    if !value.is_object() {
      return Err(ConfigError::NotAMapping);
    }
    Ok(Self { value })
  }

  pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
    let value: Value = serde_yaml::from_str(text)?;
    Self::from_value(value)
  }

  pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
    let value: Value = serde_json::from_str(text)?;
    Self::from_value(value)
  }

  /// Parse a document from text in the given format.
  pub fn parse(text: &str, format: DocumentFormat) -> Result<Self, ConfigError> {
    match format {
      DocumentFormat::Yaml => Self::from_yaml_str(text),
      DocumentFormat::Json => Self::from_json_str(text),
    }
  }

  /// Read a document from disk, choosing the format by extension.
  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
      path: path.to_path_buf(),
    })?;
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::parse(&text, format)
  }

  /// The declared `version` field, as written.
  pub fn version(&self) -> Option<&Value> {
    self.value.get("version")
  }

  pub fn as_value(&self) -> &Value {
    &self.value
  }

  pub fn into_value(self) -> Value {
    self.value
  }
}
