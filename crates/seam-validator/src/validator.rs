use seam_config::{MachineDocument, v1};
use seam_machine::MachineConfig;
use tracing::debug;

use crate::error::ValidationError;

/// Validate a raw document against the schema for its declared version.
pub fn validate(document: &MachineDocument) -> Result<MachineConfig, ValidationError> {
  let version = document.version().ok_or(ValidationError::MissingVersion)?;

  match version.as_u64() {
    Some(v1::VERSION) => {
      debug!(version = v1::VERSION, "validating machine document");
      crate::v1::validate(document)
    }
    _ => Err(ValidationError::UnsupportedVersion {
      version: version.to_string(),
    }),
  }
}

/// State and event names: uppercase letters, digits and hyphens.
pub fn is_identifier(name: &str) -> bool {
  !name.is_empty()
    && name
      .chars()
      .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
}
