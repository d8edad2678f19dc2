use seam_machine::MachineError;
use seam_registry::RegistryError;
use seam_stack::StackError;
use seam_store::StoreError;

use crate::notify::NotifyError;

/// Errors that abort a dispatch.
///
/// The request variants are raised before any I/O. The wrapped variants
/// may occur after earlier steps already completed; nothing is rolled back.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
  #[error("event is missing a stackId")]
  MissingStackId,

  #[error("event for stack '{stack_id}' has neither an event nor an action")]
  MissingEvent { stack_id: String },

  #[error("event for stack '{stack_id}' has event '{event}' and a different action '{action}'")]
  ConflictingEvent {
    stack_id: String,
    event: String,
    action: String,
  },

  #[error("event '{event}' is reserved and cannot be dispatched externally")]
  ReservedEvent { event: String },

  #[error("event '{event}' for stack '{stack_id}' requires a task name")]
  MissingTask { stack_id: String, event: String },

  #[error("event '{event}' for stack '{stack_id}' requires a description")]
  MissingDescription { stack_id: String, event: String },

  #[error("stack '{stack_id}' does not exist and the event names no machine")]
  MissingMachine { stack_id: String },

  #[error("unknown machine '{machine}' for stack '{stack_id}'")]
  UnknownMachine { stack_id: String, machine: String },

  #[error(transparent)]
  Stack(#[from] StackError),

  #[error(transparent)]
  Machine(#[from] MachineError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error(transparent)]
  Notify(#[from] NotifyError),
}

impl DispatchError {
  /// Whether the request was rejected before the store was touched.
  pub fn is_rejected_request(&self) -> bool {
    matches!(
      self,
      DispatchError::MissingStackId
        | DispatchError::MissingEvent { .. }
        | DispatchError::ConflictingEvent { .. }
        | DispatchError::ReservedEvent { .. }
        | DispatchError::MissingTask { .. }
        | DispatchError::MissingDescription { .. }
    )
  }
}
