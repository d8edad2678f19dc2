use std::collections::BTreeMap;

use seam_config::ExecutorConfig;
use serde::{Deserialize, Serialize};

/// Event reserved for internal auto-advance. Every state understands it,
/// but only the machine itself may trigger it.
pub const NEXT_EVENT: &str = "NEXT";

/// A validated machine configuration, ready to build a
/// [`StateMachine`](crate::StateMachine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
  pub version: u64,
  /// Declared external events. `NEXT` is implicit and not listed.
  pub events: Vec<String>,
  pub states: BTreeMap<String, StateConfig>,
  pub tasks: BTreeMap<String, TaskConfig>,
}

impl MachineConfig {
  pub fn get_state(&self, name: &str) -> Option<&StateConfig> {
    self.states.get(name)
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateConfig {
  /// Tasks required before this state may auto-advance, in declaration order.
  pub tasks: Vec<String>,
  pub terminal: bool,
  /// Event name -> directives, executed in order.
  pub on: BTreeMap<String, Vec<Action>>,
}

impl StateConfig {
  pub fn handles(&self, event: &str) -> bool {
    self.on.contains_key(event)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
  NoOp,
  Advance { state: String },
}

/// A task definition with its name, as sent to executors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
  pub name: String,
  #[serde(flatten)]
  pub executor: ExecutorConfig,
}
