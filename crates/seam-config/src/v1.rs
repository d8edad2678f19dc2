//! Version 1 of the machine document schema.
//!
//! ```yaml
//! version: 1
//! events: [LAUNCH, DESTROY]
//! states:
//!   INIT:
//!     on:
//!       LAUNCH: [{ action: advance, state: PROVISION }]
//!   PROVISION:
//!     tasks: [setup-machines]
//!     on:
//!       NEXT: [{ action: advance, state: RUN }]
//!   RUN:
//!     terminal: true
//! tasks:
//!   setup-machines:
//!     executor: lambda
//!     config: { name: setup-machines }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::executor::ExecutorConfig;

pub const VERSION: u64 = 1;

/// A version 1 machine definition, as written in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineDef {
  pub version: u64,
  pub events: Vec<String>,
  pub states: BTreeMap<String, StateDef>,
  #[serde(default)]
  pub tasks: BTreeMap<String, TaskDef>,
  /// Any other top-level keys. Only `x-*` extension keys are allowed; the
  /// validator rejects the rest.
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateDef {
  #[serde(default)]
  pub terminal: bool,
  #[serde(default)]
  pub tasks: Vec<String>,
  #[serde(default)]
  pub on: BTreeMap<String, Vec<ActionDef>>,
}

/// A single directive in an event's action list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", deny_unknown_fields)]
pub enum ActionDef {
  NoOp,
  Advance { state: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDef {
  #[serde(flatten)]
  pub executor: ExecutorConfig,
}
