use thiserror::Error;

/// Errors found while validating a machine document.
///
/// Each variant names the offending field; [`ValidationError::path`] gives
/// its dotted location in the document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
  /// The document has no `version` field.
  #[error("machine document is missing a `version`")]
  MissingVersion,

  /// No schema exists for the declared version.
  #[error("unsupported version number: {version}")]
  UnsupportedVersion { version: String },

  /// The document does not match the schema's shape.
  #[error("invalid machine document: {message}")]
  Malformed { message: String },

  /// A top-level key that is neither part of the schema nor an `x-` extension.
  #[error("\"{key}\" is not allowed at the top level")]
  UnknownField { key: String },

  #[error("an `INIT` state must be defined")]
  MissingInitState,

  /// A state or event name that does not match `^[A-Z0-9-]+$`.
  #[error("{kind} name \"{name}\" fails to match the required pattern: ^[A-Z0-9-]+$")]
  InvalidName { kind: NameKind, name: String },

  #[error("event \"{name}\" is declared more than once")]
  DuplicateEvent { name: String },

  /// `NEXT` is implicit and may not be declared.
  #[error("event \"NEXT\" is reserved and may not be declared")]
  ReservedEvent,

  #[error("event \"{name}\" is declared but never used by any state")]
  UnusedEvent { name: String },

  #[error("state \"{state}\" handles event \"{event}\", which is not allowed (not declared in `events`)")]
  UndeclaredEvent { state: String, event: String },

  #[error("state \"{state}\" event \"{event}\" directive {index} advances to unknown state \"{target}\"")]
  UnknownTargetState {
    state: String,
    event: String,
    index: usize,
    target: String,
  },

  #[error("state \"{state}\" requires unknown task \"{task}\"")]
  UnknownTask { state: String, task: String },

  #[error("state \"{state}\" requires task \"{task}\" more than once")]
  DuplicateStateTask { state: String, task: String },

  #[error("task \"{task}\" has invalid {executor} config: {message}")]
  InvalidTaskConfig {
    task: String,
    executor: String,
    field: String,
    message: String,
  },
}

/// What kind of name failed the identifier check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
  State,
  Event,
}

impl std::fmt::Display for NameKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      NameKind::State => write!(f, "state"),
      NameKind::Event => write!(f, "event"),
    }
  }
}

impl ValidationError {
  /// Dotted location of the offending field, if the error points at one.
  pub fn path(&self) -> Option<String> {
    match self {
      ValidationError::MissingVersion | ValidationError::UnsupportedVersion { .. } => {
        Some("version".to_string())
      }
      ValidationError::Malformed { .. } => None,
      ValidationError::UnknownField { key } => Some(key.clone()),
      ValidationError::MissingInitState => Some("states.INIT".to_string()),
      ValidationError::InvalidName {
        kind: NameKind::State,
        name,
      } => Some(format!("states.{}", name)),
      ValidationError::InvalidName {
        kind: NameKind::Event,
        ..
      }
      | ValidationError::DuplicateEvent { .. }
      | ValidationError::ReservedEvent
      | ValidationError::UnusedEvent { .. } => Some("events".to_string()),
      ValidationError::UndeclaredEvent { state, event } => {
        Some(format!("states.{}.on.{}", state, event))
      }
      ValidationError::UnknownTargetState {
        state,
        event,
        index,
        ..
      } => Some(format!("states.{}.on.{}[{}].state", state, event, index)),
      ValidationError::UnknownTask { state, .. }
      | ValidationError::DuplicateStateTask { state, .. } => {
        Some(format!("states.{}.tasks", state))
      }
      ValidationError::InvalidTaskConfig { task, field, .. } => {
        Some(format!("tasks.{}.config.{}", task, field))
      }
    }
  }
}
