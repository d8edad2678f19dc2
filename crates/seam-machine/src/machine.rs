use seam_stack::Stack;
use tracing::{debug, info, warn};

use crate::config::{Action, MachineConfig, NEXT_EVENT, StateConfig, TaskConfig};
use crate::error::MachineError;

/// Upper bound on chained `NEXT` transitions triggered by one satisfied task.
pub const MAX_AUTO_ADVANCE_STEPS: usize = 64;

/// Interpreter for a validated [`MachineConfig`].
///
/// The machine is immutable once built and can be shared between
/// dispatches; every call takes the stack it operates on.
#[derive(Debug, Clone)]
pub struct StateMachine {
  config: MachineConfig,
}

impl StateMachine {
  pub fn new(config: MachineConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &MachineConfig {
    &self.config
  }

  /// Run the directives the current state declares for `action`.
  pub fn process_action(&self, stack: &mut Stack, action: &str) -> Result<(), MachineError> {
    let state = self.get_state(stack.state())?;
    let directives = state
      .on
      .get(action)
      .ok_or_else(|| MachineError::ActionNotAvailable {
        stack_id: stack.id().to_string(),
        action: action.to_string(),
        state: stack.state().to_string(),
      })?;

    for directive in directives {
      match directive {
        Action::NoOp => {}
        Action::Advance { state: target } => self.enter_state(stack, target)?,
      }
    }

    Ok(())
  }

  /// Mark `task` satisfied and, once every task in a non-terminal state is
  /// done, advance with `NEXT`.
  ///
  /// The advance keeps going while the stack lands in states that are
  /// already satisfied, not terminal and handle `NEXT`.
  pub fn satisfy_task(&self, stack: &mut Stack, task: &str) -> Result<(), MachineError> {
    info!(stack_id = %stack.id(), task = %task, "satisfying task");
    stack.satisfy_task(task)?;

    if !stack.is_satisfied() || self.is_terminal_state(stack.state())? {
      return Ok(());
    }

    let mut steps = 0;
    loop {
      if steps == MAX_AUTO_ADVANCE_STEPS {
        return Err(MachineError::AutoAdvanceLimit {
          stack_id: stack.id().to_string(),
          steps,
        });
      }

      let before = stack.state().to_string();
      self.process_action(stack, NEXT_EVENT)?;
      steps += 1;

      if stack.state() == before || !stack.is_satisfied() {
        break;
      }
      let state = self.get_state(stack.state())?;
      if state.terminal || !state.handles(NEXT_EVENT) {
        break;
      }
      debug!(stack_id = %stack.id(), state = %stack.state(), "state already satisfied, advancing");
    }

    Ok(())
  }

  /// Record that `task` failed. The stack stays in its current state until
  /// the task is retried.
  pub fn indicate_task_failure(
    &self,
    stack: &mut Stack,
    task: &str,
    description: &str,
  ) -> Result<(), MachineError> {
    warn!(stack_id = %stack.id(), task = %task, description = %description, "task failed");
    stack.indicate_task_failure(task, description)?;
    Ok(())
  }

  pub fn is_terminal_state(&self, state: &str) -> Result<bool, MachineError> {
    Ok(self.get_state(state)?.terminal)
  }

  /// Executor configuration for a task, including its name.
  pub fn get_task(&self, task: &str) -> Option<&TaskConfig> {
    self.config.tasks.get(task)
  }

  /// Like [`get_task`](Self::get_task), but a missing task is an error.
  pub fn task(&self, task: &str) -> Result<&TaskConfig, MachineError> {
    self.get_task(task).ok_or_else(|| MachineError::UnknownTask {
      task: task.to_string(),
    })
  }

  fn enter_state(&self, stack: &mut Stack, target: &str) -> Result<(), MachineError> {
    let state = self.get_state(target)?;
    debug!(stack_id = %stack.id(), from = %stack.state(), to = %target, "advancing");

    stack.set_state(target);
    for task in &state.tasks {
      stack.add_task(task.clone())?;
    }

    Ok(())
  }

  fn get_state(&self, name: &str) -> Result<&StateConfig, MachineError> {
    self
      .config
      .get_state(name)
      .ok_or_else(|| MachineError::UnknownState {
        state: name.to_string(),
      })
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;
  use seam_config::{ExecutorConfig, LambdaConfig};
  use seam_stack::TaskStatus;

  fn advance(state: &str) -> Vec<Action> {
    vec![Action::Advance {
      state: state.to_string(),
    }]
  }

  fn state(tasks: &[&str], terminal: bool, on: &[(&str, Vec<Action>)]) -> StateConfig {
    StateConfig {
      tasks: tasks.iter().map(|t| t.to_string()).collect(),
      terminal,
      on: on
        .iter()
        .map(|(event, actions)| (event.to_string(), actions.clone()))
        .collect(),
    }
  }

  fn lambda(name: &str) -> TaskConfig {
    TaskConfig {
      name: name.to_string(),
      executor: ExecutorConfig::Lambda(LambdaConfig {
        name: format!("fn-{}", name),
      }),
    }
  }

  fn machine() -> StateMachine {
    let mut states = BTreeMap::new();
    states.insert(
      "INIT".to_string(),
      state(&[], false, &[("LAUNCH", advance("PROVISION"))]),
    );
    states.insert(
      "PROVISION".to_string(),
      state(&["setup-machines"], false, &[("NEXT", advance("LAUNCH"))]),
    );
    states.insert(
      "LAUNCH".to_string(),
      state(&["launch-tasks"], false, &[("NEXT", advance("RUN"))]),
    );
    states.insert("RUN".to_string(), state(&[], true, &[]));

    let tasks = ["setup-machines", "launch-tasks"]
      .iter()
      .map(|t| (t.to_string(), lambda(t)))
      .collect();

    StateMachine::new(MachineConfig {
      version: 1,
      events: vec!["LAUNCH".to_string()],
      states,
      tasks,
    })
  }

  #[test]
  fn test_advances_to_provision_on_launch() {
    let machine = machine();
    let mut stack = Stack::new("master", "prod");

    machine.process_action(&mut stack, "LAUNCH").unwrap();

    assert_eq!(stack.state(), "PROVISION");
    assert_eq!(stack.previous_state(), Some("INIT"));
    assert!(!stack.is_satisfied());
    assert_eq!(stack.tasks().len(), 1);
    assert_eq!(stack.tasks()[0].name, "setup-machines");
    assert_eq!(stack.tasks()[0].status, TaskStatus::Pending);
  }

  #[test]
  fn test_advances_automatically_when_tasks_completed() {
    let machine = machine();
    let mut stack = Stack::new("master", "prod");
    machine.process_action(&mut stack, "LAUNCH").unwrap();

    machine.satisfy_task(&mut stack, "setup-machines").unwrap();

    assert_eq!(stack.state(), "LAUNCH");
    assert!(!stack.is_satisfied());
    assert_eq!(stack.pending_tasks().count(), 1);
    assert!(stack.get_task("launch-tasks").is_some());

    machine.satisfy_task(&mut stack, "launch-tasks").unwrap();
    assert_eq!(stack.state(), "RUN");
    assert!(stack.tasks().is_empty());
    assert!(machine.is_terminal_state(stack.state()).unwrap());
  }

  #[test]
  fn test_does_not_advance_in_terminal_state() {
    let mut config = machine().config().clone();
    config.states.get_mut("RUN").unwrap().tasks = vec!["launch-tasks".to_string()];
    let machine = StateMachine::new(config);

    let mut stack = Stack::with_state("master", "prod", "RUN");
    stack.add_task("launch-tasks").unwrap();
    machine.satisfy_task(&mut stack, "launch-tasks").unwrap();

    assert_eq!(stack.state(), "RUN");
    assert_eq!(stack.previous_state(), None);
    assert!(stack.is_satisfied());
  }

  #[test]
  fn test_indicates_task_failure() {
    let machine = machine();
    let mut stack = Stack::new("master", "prod");
    machine.process_action(&mut stack, "LAUNCH").unwrap();

    machine
      .indicate_task_failure(&mut stack, "setup-machines", "An error")
      .unwrap();

    assert_eq!(stack.state(), "PROVISION");
    assert!(!stack.is_satisfied());
    assert!(stack.has_error());
  }

  #[test]
  fn test_unknown_action() {
    let machine = machine();
    let mut stack = Stack::new("master", "prod");

    let err = machine.process_action(&mut stack, "DESTROY").unwrap_err();
    assert!(matches!(err, MachineError::ActionNotAvailable { .. }));
    assert_eq!(
      err.to_string(),
      "action 'DESTROY' is not available on stack 'master' while in state 'INIT'"
    );
  }

  #[test]
  fn test_unknown_state() {
    let machine = machine();
    let mut stack = Stack::with_state("master", "prod", "GONE");

    let err = machine.process_action(&mut stack, "LAUNCH").unwrap_err();
    assert!(matches!(err, MachineError::UnknownState { .. }));
    assert!(machine.is_terminal_state("GONE").is_err());
  }

  #[test]
  fn test_satisfy_untracked_task() {
    let machine = machine();
    let mut stack = Stack::new("master", "prod");

    let err = machine.satisfy_task(&mut stack, "setup-machines").unwrap_err();
    assert!(matches!(err, MachineError::Stack(_)));
  }

  #[test]
  fn test_no_op_directive() {
    let mut config = machine().config().clone();
    config
      .states
      .get_mut("INIT")
      .unwrap()
      .on
      .insert("PING".to_string(), vec![Action::NoOp]);
    let machine = StateMachine::new(config);
    let mut stack = Stack::new("master", "prod");

    machine.process_action(&mut stack, "PING").unwrap();
    assert_eq!(stack.state(), "INIT");
    assert_eq!(stack.previous_state(), None);
  }

  #[test]
  fn test_directives_run_in_order() {
    let mut config = machine().config().clone();
    config.states.get_mut("INIT").unwrap().on.insert(
      "JUMP".to_string(),
      vec![
        Action::Advance {
          state: "PROVISION".to_string(),
        },
        Action::NoOp,
        Action::Advance {
          state: "LAUNCH".to_string(),
        },
      ],
    );
    let machine = StateMachine::new(config);
    let mut stack = Stack::new("master", "prod");

    machine.process_action(&mut stack, "JUMP").unwrap();
    assert_eq!(stack.state(), "LAUNCH");
    assert_eq!(stack.previous_state(), Some("PROVISION"));
    assert_eq!(stack.tasks().len(), 1);
    assert_eq!(stack.tasks()[0].name, "launch-tasks");
  }

  #[test]
  fn test_cascades_through_satisfied_states() {
    let mut config = machine().config().clone();
    config.states.insert(
      "WAIT".to_string(),
      state(&[], false, &[("NEXT", advance("LAUNCH"))]),
    );
    config.states.get_mut("PROVISION").unwrap().on = [("NEXT".to_string(), advance("WAIT"))].into();
    let machine = StateMachine::new(config);

    let mut stack = Stack::new("master", "prod");
    machine.process_action(&mut stack, "LAUNCH").unwrap();
    machine.satisfy_task(&mut stack, "setup-machines").unwrap();

    assert_eq!(stack.state(), "LAUNCH");
    assert_eq!(stack.previous_state(), Some("WAIT"));
    assert_eq!(stack.pending_tasks().count(), 1);
  }

  #[test]
  fn test_cascade_stops_at_state_without_next() {
    let mut config = machine().config().clone();
    config
      .states
      .insert("HOLD".to_string(), state(&[], false, &[("GO", advance("RUN"))]));
    config.states.get_mut("PROVISION").unwrap().on = [("NEXT".to_string(), advance("HOLD"))].into();
    let machine = StateMachine::new(config);

    let mut stack = Stack::new("master", "prod");
    machine.process_action(&mut stack, "LAUNCH").unwrap();
    machine.satisfy_task(&mut stack, "setup-machines").unwrap();

    assert_eq!(stack.state(), "HOLD");
    assert!(stack.is_satisfied());
  }

  #[test]
  fn test_cascade_cycle_is_bounded() {
    let mut config = machine().config().clone();
    config.states.insert(
      "PING".to_string(),
      state(&[], false, &[("NEXT", advance("PONG"))]),
    );
    config.states.insert(
      "PONG".to_string(),
      state(&[], false, &[("NEXT", advance("PING"))]),
    );
    config.states.get_mut("PROVISION").unwrap().on = [("NEXT".to_string(), advance("PING"))].into();
    let machine = StateMachine::new(config);

    let mut stack = Stack::new("master", "prod");
    machine.process_action(&mut stack, "LAUNCH").unwrap();
    let err = machine.satisfy_task(&mut stack, "setup-machines").unwrap_err();

    assert!(matches!(
      err,
      MachineError::AutoAdvanceLimit { steps, .. } if steps == MAX_AUTO_ADVANCE_STEPS
    ));
  }

  #[test]
  fn test_get_task() {
    let machine = machine();
    let task = machine.get_task("setup-machines").unwrap();
    assert_eq!(task.name, "setup-machines");
    assert_eq!(task.executor.kind(), "lambda");
    assert!(machine.get_task("missing").is_none());
    assert!(matches!(
      machine.task("missing"),
      Err(MachineError::UnknownTask { .. })
    ));
  }
}
