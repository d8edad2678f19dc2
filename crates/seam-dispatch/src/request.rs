use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DispatchError;
use crate::event::{TASK_COMPLETED, TASK_ERROR};

/// An inbound event as it arrives on the wire.
///
/// Every field is optional at this level so that a malformed event turns
/// into a [`DispatchError`] rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stack_id: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub event: Option<String>,

  /// Deprecated spelling of `event`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub action: Option<String>,

  /// Machine for a stack that does not exist yet.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub machine: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub task: Option<TaskRef>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
  pub name: String,
}

impl EventRequest {
  pub fn new(stack_id: impl Into<String>, event: impl Into<String>) -> Self {
    Self {
      stack_id: Some(stack_id.into()),
      event: Some(event.into()),
      ..Self::default()
    }
  }

  pub fn with_machine(mut self, machine: impl Into<String>) -> Self {
    self.machine = Some(machine.into());
    self
  }

  pub fn with_task(mut self, name: impl Into<String>) -> Self {
    self.task = Some(TaskRef { name: name.into() });
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self
      .metadata
      .get_or_insert_with(Map::new)
      .insert(key.into(), value.into());
    self
  }

  /// The stack id, rejecting absent or empty ids.
  pub fn stack_id(&self) -> Result<&str, DispatchError> {
    self
      .stack_id
      .as_deref()
      .filter(|id| !id.is_empty())
      .ok_or(DispatchError::MissingStackId)
  }

  pub(crate) fn machine(&self) -> Option<&str> {
    self.machine.as_deref().filter(|m| !m.is_empty())
  }

  pub(crate) fn task_name(&self) -> Option<&str> {
    self
      .task
      .as_ref()
      .map(|t| t.name.as_str())
      .filter(|name| !name.is_empty())
  }

  pub(crate) fn description(&self) -> Option<&str> {
    self.description.as_deref().filter(|d| !d.is_empty())
  }
}

/// What an executor reports back once it has run a task.
///
/// Delivered through the same channel as any other event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
  pub event: String,
  pub stack_id: String,
  pub task: TaskRef,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl TaskResult {
  pub fn completed(stack_id: impl Into<String>, task: impl Into<String>) -> Self {
    Self {
      event: TASK_COMPLETED.to_string(),
      stack_id: stack_id.into(),
      task: TaskRef { name: task.into() },
      description: None,
    }
  }

  pub fn failed(
    stack_id: impl Into<String>,
    task: impl Into<String>,
    description: impl Into<String>,
  ) -> Self {
    Self {
      event: TASK_ERROR.to_string(),
      stack_id: stack_id.into(),
      task: TaskRef { name: task.into() },
      description: Some(description.into()),
    }
  }
}

impl From<TaskResult> for EventRequest {
  fn from(result: TaskResult) -> Self {
    Self {
      stack_id: Some(result.stack_id),
      event: Some(result.event),
      task: Some(result.task),
      description: result.description,
      ..Self::default()
    }
  }
}
