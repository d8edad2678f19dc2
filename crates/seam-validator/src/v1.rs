//! Version 1 schema checks.

use std::collections::{BTreeMap, HashSet};

use seam_config::v1::{ActionDef, MachineDef, StateDef};
use seam_config::{ExecutorConfig, MachineDocument, TerraformSource};
use seam_machine::{Action, MachineConfig, NEXT_EVENT, StateConfig, TaskConfig};
use seam_stack::INITIAL_STATE;

use crate::error::{NameKind, ValidationError};
use crate::validator::is_identifier;

const EXTENSION_PREFIX: &str = "x-";

pub(crate) fn validate(document: &MachineDocument) -> Result<MachineConfig, ValidationError> {
  let def: MachineDef =
    serde_json::from_value(document.as_value().clone()).map_err(|e| ValidationError::Malformed {
      message: e.to_string(),
    })?;

  if let Some(key) = def.extra.keys().find(|k| !k.starts_with(EXTENSION_PREFIX)) {
    return Err(ValidationError::UnknownField { key: key.clone() });
  }

  if !def.states.contains_key(INITIAL_STATE) {
    return Err(ValidationError::MissingInitState);
  }

  let events = validate_events(&def.events)?;

  for name in def.states.keys() {
    if !is_identifier(name) {
      return Err(ValidationError::InvalidName {
        kind: NameKind::State,
        name: name.clone(),
      });
    }
  }

  let mut used_events = HashSet::new();
  let mut states = BTreeMap::new();
  for (name, state) in &def.states {
    let config = validate_state(name, state, &def, &events)?;
    used_events.extend(config.on.keys().cloned());
    states.insert(name.clone(), config);
  }

  if let Some(unused) = def.events.iter().find(|e| !used_events.contains(*e)) {
    return Err(ValidationError::UnusedEvent {
      name: unused.clone(),
    });
  }

  let mut tasks = BTreeMap::new();
  for (name, task) in def.tasks {
    validate_executor(&name, &task.executor)?;
    tasks.insert(
      name.clone(),
      TaskConfig {
        name,
        executor: task.executor,
      },
    );
  }

  Ok(MachineConfig {
    version: def.version,
    events: def.events,
    states,
    tasks,
  })
}

fn validate_events(events: &[String]) -> Result<HashSet<&str>, ValidationError> {
  let mut seen = HashSet::new();
  for event in events {
    if !is_identifier(event) {
      return Err(ValidationError::InvalidName {
        kind: NameKind::Event,
        name: event.clone(),
      });
    }
    if event == NEXT_EVENT {
      return Err(ValidationError::ReservedEvent);
    }
    if !seen.insert(event.as_str()) {
      return Err(ValidationError::DuplicateEvent {
        name: event.clone(),
      });
    }
  }
  Ok(seen)
}

fn validate_state(
  name: &str,
  state: &StateDef,
  def: &MachineDef,
  events: &HashSet<&str>,
) -> Result<StateConfig, ValidationError> {
  let mut required = HashSet::new();
  for task in &state.tasks {
    if !def.tasks.contains_key(task) {
      return Err(ValidationError::UnknownTask {
        state: name.to_string(),
        task: task.clone(),
      });
    }
    if !required.insert(task.as_str()) {
      return Err(ValidationError::DuplicateStateTask {
        state: name.to_string(),
        task: task.clone(),
      });
    }
  }

  let mut on = BTreeMap::new();
  for (event, directives) in &state.on {
    if event != NEXT_EVENT && !events.contains(event.as_str()) {
      return Err(ValidationError::UndeclaredEvent {
        state: name.to_string(),
        event: event.clone(),
      });
    }

    let mut actions = Vec::with_capacity(directives.len());
    for (index, directive) in directives.iter().enumerate() {
      actions.push(match directive {
        ActionDef::NoOp => Action::NoOp,
        ActionDef::Advance { state: target } => {
          if !def.states.contains_key(target) {
            return Err(ValidationError::UnknownTargetState {
              state: name.to_string(),
              event: event.clone(),
              index,
              target: target.clone(),
            });
          }
          Action::Advance {
            state: target.clone(),
          }
        }
      });
    }
    on.insert(event.clone(), actions);
  }

  Ok(StateConfig {
    tasks: state.tasks.clone(),
    terminal: state.terminal,
    on,
  })
}

fn validate_executor(task: &str, executor: &ExecutorConfig) -> Result<(), ValidationError> {
  let required: Vec<(&str, &str)> = match executor {
    ExecutorConfig::Terraform(tf) => match &tf.source {
      TerraformSource::S3 { bucket, key } => {
        vec![("source.bucket", bucket.as_str()), ("source.key", key.as_str())]
      }
      TerraformSource::Local { location } => vec![("source.location", location.as_str())],
    },
    ExecutorConfig::Lambda(lambda) => vec![("name", lambda.name.as_str())],
  };

  if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
    return Err(ValidationError::InvalidTaskConfig {
      task: task.to_string(),
      executor: executor.kind().to_string(),
      field: field.to_string(),
      message: format!("`{}` must not be empty", field),
    });
  }

  if let ExecutorConfig::Terraform(tf) = executor
    && let Some((key, _)) = tf
      .variables
      .iter()
      .find(|(_, v)| v.is_object() || v.is_array())
  {
    return Err(ValidationError::InvalidTaskConfig {
      task: task.to_string(),
      executor: executor.kind().to_string(),
      field: format!("variables.{}", key),
      message: format!("variable `{}` must be a scalar", key),
    });
  }

  Ok(())
}
