use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StackError;
use crate::task::{TaskRecord, TaskStatus};

/// State every new stack starts in.
pub const INITIAL_STATE: &str = "INIT";

/// Flat key/value context forwarded to task executors.
pub type Metadata = BTreeMap<String, Value>;

/// One running workflow instance.
///
/// Fields are private so the invariants hold: task names are unique, and
/// changing state always records the previous state and clears the task
/// list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
  id: String,
  machine: String,
  state: String,
  #[serde(default)]
  previous_state: Option<String>,
  #[serde(default)]
  tasks: Vec<TaskRecord>,
  #[serde(default)]
  metadata: Metadata,
}

impl Stack {
  /// Create a fresh stack in the initial state.
  pub fn new(id: impl Into<String>, machine: impl Into<String>) -> Self {
    Self::with_state(id, machine, INITIAL_STATE)
  }

  /// Create a fresh stack starting in `state`.
  pub fn with_state(
    id: impl Into<String>,
    machine: impl Into<String>,
    state: impl Into<String>,
  ) -> Self {
    Self {
      id: id.into(),
      machine: machine.into(),
      state: state.into(),
      previous_state: None,
      tasks: Vec::new(),
      metadata: Metadata::new(),
    }
  }

  /// Rehydrate a stack from its persisted JSON form.
  pub fn from_json(data: &str) -> Result<Self, StackError> {
    let stack: Stack = serde_json::from_str(data)?;

    let mut seen = HashSet::new();
    for task in &stack.tasks {
      if !seen.insert(task.name.as_str()) {
        return Err(StackError::DuplicateTask {
          stack_id: stack.id.clone(),
          name: task.name.clone(),
        });
      }
    }

    Ok(stack)
  }

  pub fn to_json(&self) -> Result<String, StackError> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn machine(&self) -> &str {
    &self.machine
  }

  /// Fail unless `requested` is the machine this stack was created with.
  pub fn ensure_machine(&self, requested: &str) -> Result<(), StackError> {
    if self.machine != requested {
      return Err(StackError::MachineChange {
        stack_id: self.id.clone(),
        current: self.machine.clone(),
        requested: requested.to_string(),
      });
    }
    Ok(())
  }

  pub fn state(&self) -> &str {
    &self.state
  }

  pub fn previous_state(&self) -> Option<&str> {
    self.previous_state.as_deref()
  }

  /// Move to `state`. The current state becomes the previous state and the
  /// task list is emptied, ready to be filled with the new state's tasks.
  pub fn set_state(&mut self, state: impl Into<String>) {
    let previous = std::mem::replace(&mut self.state, state.into());
    self.previous_state = Some(previous);
    self.tasks.clear();
  }

  pub fn tasks(&self) -> &[TaskRecord] {
    &self.tasks
  }

  pub fn get_task(&self, name: &str) -> Option<&TaskRecord> {
    self.tasks.iter().find(|t| t.name == name)
  }

  pub fn pending_tasks(&self) -> impl Iterator<Item = &TaskRecord> {
    self.tasks.iter().filter(|t| t.is_pending())
  }

  pub fn failed_tasks(&self) -> impl Iterator<Item = &TaskRecord> {
    self.tasks.iter().filter(|t| t.is_error())
  }

  /// True when every tracked task is satisfied (vacuously true with none).
  pub fn is_satisfied(&self) -> bool {
    self.tasks.iter().all(TaskRecord::is_satisfied)
  }

  pub fn has_error(&self) -> bool {
    self.tasks.iter().any(TaskRecord::is_error)
  }

  /// Track a new pending task.
  pub fn add_task(&mut self, name: impl Into<String>) -> Result<(), StackError> {
    let name = name.into();
    if self.get_task(&name).is_some() {
      return Err(StackError::DuplicateTask {
        stack_id: self.id.clone(),
        name,
      });
    }
    self.tasks.push(TaskRecord::pending(name));
    Ok(())
  }

  /// Mark a task satisfied, clearing any earlier error.
  pub fn satisfy_task(&mut self, name: &str) -> Result<(), StackError> {
    let task = self.task_mut(name)?;
    task.status = TaskStatus::Satisfied;
    task.error_message = None;
    Ok(())
  }

  pub fn indicate_task_failure(
    &mut self,
    name: &str,
    description: impl Into<String>,
  ) -> Result<(), StackError> {
    let task = self.task_mut(name)?;
    task.status = TaskStatus::Error;
    task.error_message = Some(description.into());
    Ok(())
  }

  /// Put every failed task back to pending so it can be retried.
  pub fn reset_failed_tasks(&mut self) {
    for task in self.tasks.iter_mut().filter(|t| t.is_error()) {
      task.status = TaskStatus::Pending;
      task.error_message = None;
    }
  }

  pub fn metadata(&self) -> &Metadata {
    &self.metadata
  }

  /// Merge `metadata` over the existing metadata.
  ///
  /// Values must be scalars; objects and arrays are rejected and nothing is
  /// merged.
  pub fn add_metadata<I>(&mut self, metadata: I) -> Result<(), StackError>
  where
    I: IntoIterator<Item = (String, Value)>,
  {
    let entries: Vec<(String, Value)> = metadata.into_iter().collect();
    if let Some((key, _)) = entries
      .iter()
      .find(|(_, v)| v.is_object() || v.is_array())
    {
      return Err(StackError::NestedMetadata { key: key.clone() });
    }
    self.metadata.extend(entries);
    Ok(())
  }

  fn task_mut(&mut self, name: &str) -> Result<&mut TaskRecord, StackError> {
    let stack_id = &self.id;
    self
      .tasks
      .iter_mut()
      .find(|t| t.name == name)
      .ok_or_else(|| StackError::TaskNotFound {
        stack_id: stack_id.clone(),
        name: name.to_string(),
      })
  }
}
