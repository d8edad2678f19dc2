use std::sync::Arc;

use seam_machine::StateMachine;
use seam_registry::MachineResolver;
use seam_stack::{Stack, TaskRecord};
use seam_store::StackStore;
use tracing::{debug, error, info, instrument};

use crate::error::DispatchError;
use crate::event::Event;
use crate::notify::{TaskNotification, TaskNotifier};
use crate::request::EventRequest;

/// What a successful dispatch did.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
  /// The stack after the event was applied.
  pub stack: Stack,
  /// Names of the tasks a notification was sent for, in sending order.
  pub notified: Vec<String>,
  /// Whether the stack finished and was removed from the store.
  pub removed: bool,
}

/// Applies inbound events to stacks.
///
/// Holds no per-stack state. Callers must not dispatch two events for the
/// same stack id at the same time.
#[derive(Clone)]
pub struct Dispatcher {
  store: Arc<dyn StackStore>,
  machines: Arc<dyn MachineResolver>,
  notifier: Arc<dyn TaskNotifier>,
}

impl Dispatcher {
  pub fn new(
    store: Arc<dyn StackStore>,
    machines: Arc<dyn MachineResolver>,
    notifier: Arc<dyn TaskNotifier>,
  ) -> Self {
    Self {
      store,
      machines,
      notifier,
    }
  }

  /// Dispatch one event.
  #[instrument(
    name = "dispatch",
    skip_all,
    fields(
      stack_id = request.stack_id.as_deref().unwrap_or_default(),
    )
  )]
  pub async fn dispatch(&self, request: EventRequest) -> Result<DispatchOutcome, DispatchError> {
    let result = self.dispatch_inner(&request).await;

    match &result {
      Ok(outcome) => {
        info!(
          state = %outcome.stack.state(),
          notified = outcome.notified.len(),
          removed = outcome.removed,
          "dispatch_completed"
        );
      }
      Err(e) => {
        error!(error = %e, "dispatch_failed");
      }
    }

    result
  }

  async fn dispatch_inner(&self, request: &EventRequest) -> Result<DispatchOutcome, DispatchError> {
    let event = Event::from_request(request)?;
    let stack_id = request.stack_id()?;
    info!(event = %event.name(), "dispatch_started");

    let mut stack = self.locate_stack(stack_id, request.machine()).await?;
    if let Some(metadata) = &request.metadata {
      stack.add_metadata(metadata.clone())?;
    }

    let machine = self
      .machines
      .resolve(stack.machine())
      .await?
      .ok_or_else(|| DispatchError::UnknownMachine {
        stack_id: stack_id.to_string(),
        machine: stack.machine().to_string(),
      })?;

    let initial_state = stack.state().to_string();
    let mut notified = Vec::new();

    match &event {
      Event::TaskCompleted { task } => machine.satisfy_task(&mut stack, task)?,
      Event::TaskError { task, description } => {
        machine.indicate_task_failure(&mut stack, task, description)?
      }
      Event::RetryFailedTasks => {
        notified = self.notify(&stack, &machine, TaskRecord::is_error).await?;
        stack.reset_failed_tasks();
      }
      Event::RetryPendingTasks => {
        notified = self.notify(&stack, &machine, TaskRecord::is_pending).await?;
      }
      Event::Custom(name) => machine.process_action(&mut stack, name)?,
    }

    self.store.save_stack(&stack).await?;

    if stack.state() != initial_state {
      info!(from = %initial_state, to = %stack.state(), "stack_transitioned");
      if !stack.is_satisfied() {
        let sent = self.notify(&stack, &machine, TaskRecord::is_pending).await?;
        notified.extend(sent);
      }
    }

    let removed = stack.is_satisfied() && machine.is_terminal_state(stack.state())?;
    if removed {
      self.store.remove_stack(stack.id()).await?;
      info!(state = %stack.state(), "stack_finished");
    }

    Ok(DispatchOutcome {
      stack,
      notified,
      removed,
    })
  }

  async fn locate_stack(&self, stack_id: &str, machine: Option<&str>) -> Result<Stack, DispatchError> {
    match self.store.find_stack(stack_id).await? {
      Some(stack) => {
        if let Some(machine) = machine {
          stack.ensure_machine(machine)?;
        }
        Ok(stack)
      }
      None => {
        let machine = machine.ok_or_else(|| DispatchError::MissingMachine {
          stack_id: stack_id.to_string(),
        })?;
        debug!(machine = %machine, "creating stack");
        Ok(Stack::new(stack_id, machine))
      }
    }
  }

  /// Send one notification per task on `stack` matching `predicate`.
  async fn notify<P>(
    &self,
    stack: &Stack,
    machine: &StateMachine,
    predicate: P,
  ) -> Result<Vec<String>, DispatchError>
  where
    P: Fn(&TaskRecord) -> bool,
  {
    let mut notified = Vec::new();

    for record in stack.tasks().iter().filter(|record| predicate(record)) {
      let task = machine.task(&record.name)?.clone();
      debug!(task = %task.name, "notifying task");

      self
        .notifier
        .notify(TaskNotification {
          task,
          stack: stack.clone(),
        })
        .await?;
      notified.push(record.name.clone());
    }

    Ok(notified)
  }
}
