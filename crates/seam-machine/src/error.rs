use seam_stack::StackError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MachineError {
  #[error("unknown state requested: {state}")]
  UnknownState { state: String },

  #[error("action '{action}' is not available on stack '{stack_id}' while in state '{state}'")]
  ActionNotAvailable {
    stack_id: String,
    action: String,
    state: String,
  },

  #[error("task '{task}' is not defined by the machine")]
  UnknownTask { task: String },

  #[error("stack '{stack_id}' auto-advanced {steps} times without settling; NEXT transitions may form a cycle")]
  AutoAdvanceLimit { stack_id: String, steps: usize },

  #[error(transparent)]
  Stack(#[from] StackError),
}
