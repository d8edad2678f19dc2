//! Seam Dispatch
//!
//! Turns inbound events into stack mutations and task notifications.
//!
//! One dispatch runs strictly in order: validate the request, locate or
//! create the stack, resolve its machine, apply the event, persist, then
//! notify or retire. Validation happens before any I/O, so a rejected
//! request never touches the store.
//!
//! The three collaborators are injected as trait objects:
//! - [`StackStore`](seam_store::StackStore) persists stacks
//! - [`MachineResolver`](seam_registry::MachineResolver) finds machines by name
//! - [`TaskNotifier`] delivers task notifications to executors

mod dispatcher;
mod error;
mod event;
mod notify;
mod request;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::DispatchError;
pub use event::{
  Event, RETRY_FAILED_TASKS, RETRY_PENDING_TASKS, TASK_COMPLETED, TASK_ERROR,
};
pub use notify::{ChannelNotifier, NoopNotifier, NotifyError, TaskNotification, TaskNotifier};
pub use request::{EventRequest, TaskRef, TaskResult};
