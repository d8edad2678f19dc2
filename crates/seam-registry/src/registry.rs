use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use seam_machine::StateMachine;
use tracing::info;

use crate::error::RegistryError;
use crate::fs::{load_machine_file, machine_files};

/// Looks up the machine that governs a stack.
///
/// The dispatcher is handed a resolver rather than reaching for global
/// state, so tests can supply machines directly.
#[async_trait]
pub trait MachineResolver: Send + Sync {
  /// Find a machine by name. `None` means the name is not recognized.
  async fn resolve(&self, name: &str) -> Result<Option<Arc<StateMachine>>, RegistryError>;
}

/// Name -> machine map.
#[derive(Debug, Default, Clone)]
pub struct MachineRegistry {
  machines: HashMap<String, Arc<StateMachine>>,
}

impl MachineRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a machine under `name`, failing if the name is taken.
  pub fn insert(
    &mut self,
    name: impl Into<String>,
    machine: StateMachine,
  ) -> Result<(), RegistryError> {
    let name = name.into();
    if self.machines.contains_key(&name) {
      return Err(RegistryError::DuplicateMachine { name });
    }
    self.machines.insert(name, Arc::new(machine));
    Ok(())
  }

  /// Builder-style [`insert`](Self::insert).
  pub fn with_machine(
    mut self,
    name: impl Into<String>,
    machine: StateMachine,
  ) -> Result<Self, RegistryError> {
    self.insert(name, machine)?;
    Ok(self)
  }

  pub fn get(&self, name: &str) -> Option<Arc<StateMachine>> {
    self.machines.get(name).cloned()
  }

  /// Registered machine names, sorted.
  pub fn names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.machines.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }

  pub fn len(&self) -> usize {
    self.machines.len()
  }

  pub fn is_empty(&self) -> bool {
    self.machines.is_empty()
  }

  /// Load and validate every machine file in `dir`.
  ///
  /// Each file becomes a machine named after its file stem, so
  /// `machines/qa.yml` registers `qa`. The first invalid file aborts the
  /// load.
  pub async fn load_dir(dir: &Path) -> Result<Self, RegistryError> {
    let mut registry = Self::new();

    for path in machine_files(dir).await? {
      let (name, machine) = load_machine_file(&path).await?;
      registry.insert(name, machine)?;
    }

    info!(dir = %dir.display(), machines = ?registry.names(), "loaded machines");
    Ok(registry)
  }
}

#[async_trait]
impl MachineResolver for MachineRegistry {
  async fn resolve(&self, name: &str) -> Result<Option<Arc<StateMachine>>, RegistryError> {
    Ok(self.get(name))
  }
}
