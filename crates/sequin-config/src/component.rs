use serde::{Deserialize, Serialize};

/// A component (node) as written in a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDef {
  /// Unique name within the owning flow.
  pub name: String,

  /// Component type, e.g. "Start", "Add", "CallAction".
  #[serde(rename = "type")]
  pub component_type: String,

  #[serde(default)]
  pub inputs: Vec<InputDef>,

  #[serde(default)]
  pub outputs: Vec<OutputDef>,

  /// Free-form configuration read by the component body.
  #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
  pub properties: serde_json::Map<String, serde_json::Value>,

  /// Marks a UI widget. Widgets run once on flow start and dispatch actions.
  #[serde(default)]
  pub widget: bool,

  /// Structural components set this to false and are never scheduled.
  #[serde(default = "default_executable")]
  pub executable: bool,

  /// Name of the action flow a widget triggers.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub action: Option<String>,
}

fn default_executable() -> bool {
  true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDef {
  pub name: String,

  /// Control-flow input ("when" rather than "what").
  #[serde(default)]
  pub sequence: bool,

  #[serde(default)]
  pub optional: bool,

  /// Value delivered to the input when the component state is created.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDef {
  pub name: String,

  #[serde(default)]
  pub sequence: bool,

  #[serde(default)]
  pub optional: bool,
}
