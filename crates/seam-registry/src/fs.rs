use std::path::{Path, PathBuf};

use seam_config::{ConfigError, DocumentFormat, MachineDocument};
use seam_machine::StateMachine;
use tokio::fs;
use tracing::debug;

use crate::error::RegistryError;

/// Outcome of validating one machine file.
#[derive(Debug)]
pub struct FileReport {
  pub path: PathBuf,
  pub result: Result<(), RegistryError>,
}

/// Read, parse and validate a single machine file.
///
/// Returns the machine name (the file stem) with the built machine.
pub async fn load_machine_file(path: &Path) -> Result<(String, StateMachine), RegistryError> {
  let config_err = |source| RegistryError::Config {
    path: path.to_path_buf(),
    source,
  };

  let format = DocumentFormat::from_path(path).ok_or_else(|| {
    config_err(ConfigError::UnsupportedFormat {
      path: path.to_path_buf(),
    })
  })?;
  let name = path
    .file_stem()
    .and_then(|s| s.to_str())
    .ok_or_else(|| {
      config_err(ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
      })
    })?
    .to_string();

  let text = fs::read_to_string(path).await.map_err(|source| {
    config_err(ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })
  })?;
  let document = MachineDocument::parse(&text, format).map_err(config_err)?;
  let config = seam_validator::validate(&document).map_err(|source| RegistryError::Invalid {
    path: path.to_path_buf(),
    source,
  })?;

  debug!(machine = %name, states = config.states.len(), "validated machine");
  Ok((name, StateMachine::new(config)))
}

/// Validate every machine file in `dir`, reporting each file separately.
pub async fn validate_dir(dir: &Path) -> Result<Vec<FileReport>, RegistryError> {
  let mut reports = Vec::new();
  for path in machine_files(dir).await? {
    let result = load_machine_file(&path).await.map(|_| ());
    reports.push(FileReport { path, result });
  }
  Ok(reports)
}

/// Machine files in `dir`, sorted by path. Files with other extensions are
/// skipped.
pub(crate) async fn machine_files(dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
  let io_err = |source| RegistryError::Io {
    path: dir.to_path_buf(),
    source,
  };

  let mut entries = fs::read_dir(dir).await.map_err(io_err)?;
  let mut files = Vec::new();

  while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
    let path = entry.path();
    if !path.is_file() {
      continue;
    }
    if DocumentFormat::from_path(&path).is_none() {
      debug!(path = %path.display(), "skipping non-machine file");
      continue;
    }
    files.push(path);
  }

  files.sort();
  Ok(files)
}
