use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use seam_stack::Stack;

use crate::{StackStore, StoreError};

/// In-process store.
///
/// Stacks are kept in their serialized form so that every load goes through
/// the same decode path as a database-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
  records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Ids of all stored stacks, sorted.
  pub fn ids(&self) -> Vec<String> {
    let mut ids: Vec<String> = self.records().keys().cloned().collect();
    ids.sort();
    ids
  }

  pub fn len(&self) -> usize {
    self.records().len()
  }

  pub fn is_empty(&self) -> bool {
    self.records().is_empty()
  }

  fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
    // Every write is a single map operation, so a poisoned map is intact.
    self.records.lock().unwrap_or_else(|e| e.into_inner())
  }
}

#[async_trait]
impl StackStore for MemoryStore {
  async fn find_stack(&self, id: &str) -> Result<Option<Stack>, StoreError> {
    let data = self.records().get(id).cloned();
    data
      .map(|data| {
        Stack::from_json(&data).map_err(|source| StoreError::Corrupt {
          id: id.to_string(),
          source,
        })
      })
      .transpose()
  }

  async fn save_stack(&self, stack: &Stack) -> Result<(), StoreError> {
    let data = stack.to_json()?;
    self.records().insert(stack.id().to_string(), data);
    Ok(())
  }

  async fn remove_stack(&self, id: &str) -> Result<(), StoreError> {
    self.records().remove(id);
    Ok(())
  }
}
