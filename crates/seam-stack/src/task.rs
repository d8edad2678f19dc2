use serde::{Deserialize, Serialize};

/// Status of a task tracked on a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
  Pending,
  Satisfied,
  Error,
}

/// A task the stack is waiting on in its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
  pub name: String,
  pub status: TaskStatus,
  /// Only present while `status` is `Error`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_message: Option<String>,
}

impl TaskRecord {
  pub fn pending(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      status: TaskStatus::Pending,
      error_message: None,
    }
  }

  pub fn is_pending(&self) -> bool {
    self.status == TaskStatus::Pending
  }

  pub fn is_satisfied(&self) -> bool {
    self.status == TaskStatus::Satisfied
  }

  pub fn is_error(&self) -> bool {
    self.status == TaskStatus::Error
  }
}
