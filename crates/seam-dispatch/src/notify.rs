//! Outbound task notifications.
//!
//! A notification asks an executor to run one task for one stack. The
//! executor answers later with a [`TaskResult`] sent as a new event.

use async_trait::async_trait;
use seam_machine::TaskConfig;
use seam_stack::Stack;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::request::TaskResult;

/// The message sent for every task that should run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNotification {
  /// Task definition, including its name and executor configuration.
  pub task: TaskConfig,
  /// Snapshot of the stack at the time of sending.
  pub stack: Stack,
}

impl TaskNotification {
  /// The reply an executor sends when the task succeeded.
  pub fn completed(&self) -> TaskResult {
    TaskResult::completed(self.stack.id(), &self.task.name)
  }

  /// The reply an executor sends when the task failed.
  pub fn failed(&self, description: impl Into<String>) -> TaskResult {
    TaskResult::failed(self.stack.id(), &self.task.name, description)
  }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
  #[error("notification channel is closed, task '{task}' was not delivered")]
  Closed { task: String },

  #[error("failed to deliver task '{task}': {message}")]
  Delivery { task: String, message: String },
}

/// Delivers task notifications to whatever runs the tasks.
///
/// The dispatcher awaits each call before moving on, so an error stops the
/// dispatch.
#[async_trait]
pub trait TaskNotifier: Send + Sync {
  async fn notify(&self, notification: TaskNotification) -> Result<(), NotifyError>;
}

/// A notifier that discards all notifications.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl TaskNotifier for NoopNotifier {
  async fn notify(&self, _notification: TaskNotification) -> Result<(), NotifyError> {
    Ok(())
  }
}

/// A notifier that sends notifications to an unbounded channel.
///
/// Unlike a fire-and-forget observer, a dropped receiver is an error here:
/// a task nobody hears about would never run.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<TaskNotification>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<TaskNotification>) -> Self {
    Self { sender }
  }

  /// A notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<TaskNotification>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

#[async_trait]
impl TaskNotifier for ChannelNotifier {
  async fn notify(&self, notification: TaskNotification) -> Result<(), NotifyError> {
    self.sender.send(notification).map_err(|err| NotifyError::Closed {
      task: err.0.task.name,
    })
  }
}
