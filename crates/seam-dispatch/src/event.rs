use seam_machine::NEXT_EVENT;
use tracing::warn;

use crate::error::DispatchError;
use crate::request::EventRequest;

pub const TASK_COMPLETED: &str = "TASK_COMPLETED";
pub const TASK_ERROR: &str = "TASK_ERROR";
pub const RETRY_FAILED_TASKS: &str = "RETRY_FAILED_TASKS";
pub const RETRY_PENDING_TASKS: &str = "RETRY_PENDING_TASKS";

/// A validated inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  TaskCompleted { task: String },
  TaskError { task: String, description: String },
  RetryFailedTasks,
  RetryPendingTasks,
  /// Any other event, handed to the machine as-is.
  Custom(String),
}

impl Event {
  /// Check every field the event needs, without touching any state.
  pub fn from_request(request: &EventRequest) -> Result<Self, DispatchError> {
    let stack_id = request.stack_id()?;
    let name = event_name(stack_id, request)?;

    if name == NEXT_EVENT {
      return Err(DispatchError::ReservedEvent {
        event: name.to_string(),
      });
    }

    let task = || {
      request
        .task_name()
        .map(str::to_string)
        .ok_or_else(|| DispatchError::MissingTask {
          stack_id: stack_id.to_string(),
          event: name.to_string(),
        })
    };

    let event = match name {
      TASK_COMPLETED => Event::TaskCompleted { task: task()? },
      TASK_ERROR => {
        let task = task()?;
        let description = request
          .description()
          .ok_or_else(|| DispatchError::MissingDescription {
            stack_id: stack_id.to_string(),
            event: name.to_string(),
          })?;
        Event::TaskError {
          task,
          description: description.to_string(),
        }
      }
      RETRY_FAILED_TASKS => Event::RetryFailedTasks,
      RETRY_PENDING_TASKS => Event::RetryPendingTasks,
      other => Event::Custom(other.to_string()),
    };

    Ok(event)
  }

  pub fn name(&self) -> &str {
    match self {
      Event::TaskCompleted { .. } => TASK_COMPLETED,
      Event::TaskError { .. } => TASK_ERROR,
      Event::RetryFailedTasks => RETRY_FAILED_TASKS,
      Event::RetryPendingTasks => RETRY_PENDING_TASKS,
      Event::Custom(name) => name.as_str(),
    }
  }
}

fn event_name<'a>(stack_id: &str, request: &'a EventRequest) -> Result<&'a str, DispatchError> {
  let event = request.event.as_deref().filter(|e| !e.is_empty());
  let action = request.action.as_deref().filter(|a| !a.is_empty());

  match (event, action) {
    (Some(event), Some(action)) if event != action => Err(DispatchError::ConflictingEvent {
      stack_id: stack_id.to_string(),
      event: event.to_string(),
      action: action.to_string(),
    }),
    (Some(event), _) => Ok(event),
    (None, Some(action)) => {
      warn!(stack_id = %stack_id, action = %action, "'action' is deprecated, send 'event' instead");
      Ok(action)
    }
    (None, None) => Err(DispatchError::MissingEvent {
      stack_id: stack_id.to_string(),
    }),
  }
}
