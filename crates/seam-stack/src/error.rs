use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
  #[error("task '{name}' already defined on stack '{stack_id}'")]
  DuplicateTask { stack_id: String, name: String },

  #[error("unable to find task '{name}' on stack '{stack_id}'")]
  TaskNotFound { stack_id: String, name: String },

  #[error("metadata must be a flat object: key '{key}' holds a nested value")]
  NestedMetadata { key: String },

  #[error("stack '{stack_id}' is governed by machine '{current}' and cannot move to '{requested}'")]
  MachineChange {
    stack_id: String,
    current: String,
    requested: String,
  },

  #[error("invalid stack record: {0}")]
  Decode(#[from] serde_json::Error),
}
