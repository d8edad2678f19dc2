use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Executor-specific configuration for a task.
///
/// Serialized as `{ "executor": "<kind>", "config": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "executor", content = "config", rename_all = "lowercase")]
pub enum ExecutorConfig {
  /// Run an infrastructure-as-code module.
  Terraform(TerraformConfig),
  /// Invoke a function by name.
  Lambda(LambdaConfig),
}

impl ExecutorConfig {
  /// Short executor identifier, as written in machine documents.
  pub fn kind(&self) -> &'static str {
    match self {
      ExecutorConfig::Terraform(_) => "terraform",
      ExecutorConfig::Lambda(_) => "lambda",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TerraformConfig {
  pub source: TerraformSource,
  pub action: TerraformAction,
  /// Extra variables passed to the run, merged over the stack metadata.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub variables: BTreeMap<String, serde_json::Value>,
}

/// Where the module sources live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum TerraformSource {
  S3 { bucket: String, key: String },
  Local { location: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerraformAction {
  Apply,
  Destroy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LambdaConfig {
  /// Target function identifier.
  pub name: String,
}
