use serde::{Deserialize, Serialize};

use crate::flow::FlowDef;

/// A complete project: every page and action flow plus the global variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDef {
  pub name: String,
  #[serde(default)]
  pub global_variables: Vec<VariableDef>,
  #[serde(default)]
  pub flows: Vec<FlowDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
  pub name: String,
  #[serde(default)]
  pub default_value: serde_json::Value,
  /// Persistent globals survive restarts through the runtime settings.
  #[serde(default)]
  pub persistent: bool,
}
