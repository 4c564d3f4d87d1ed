use serde::{Deserialize, Serialize};

use crate::flow::FlowId;

/// Implicit control-flow input.
pub const SEQIN_INPUT: &str = "@seqin";
/// Implicit control-flow output, fired after a component completes.
pub const SEQOUT_OUTPUT: &str = "@seqout";
/// Implicit output carrying the message of a failed execution.
pub const ERROR_OUTPUT: &str = "@error";

/// Identifies a component within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId {
  pub flow: FlowId,
  pub index: usize,
}

/// What the scheduler needs to know about a component, decided once at load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
  /// Entry point of an action.
  Start,
  /// Receives an argument when the action is called. Never scheduled.
  Input,
  /// Returns a value to the calling component.
  Output,
  /// Continues the calling component's sequence.
  End,
  /// Receives routed error messages.
  CatchError,
  /// Raises a user error.
  Error,
  /// Spawns a child flow state for an action.
  CallAction,
  /// UI element. Always ready, runs on flow start.
  Widget,
  Generic,
}

impl ComponentKind {
  /// Resolve the kind from a component type name.
  pub fn resolve(component_type: &str, widget: bool) -> Self {
    if widget {
      return Self::Widget;
    }

    match component_type {
      "Start" | "StartAction" => Self::Start,
      "Input" | "InputAction" => Self::Input,
      "Output" | "OutputAction" => Self::Output,
      "End" | "EndAction" => Self::End,
      "CatchError" | "CatchErrorAction" => Self::CatchError,
      "Error" | "ErrorAction" => Self::Error,
      "CallAction" => Self::CallAction,
      _ => Self::Generic,
    }
  }

  /// Whether the loader adds an implicit `@seqin` to this kind.
  pub(crate) fn takes_sequence_input(self) -> bool {
    !matches!(
      self,
      Self::Start | Self::Input | Self::CatchError | Self::Widget
    )
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInput {
  pub name: String,
  pub is_sequence_input: bool,
  pub is_optional_input: bool,
  /// Delivered when the component state is created.
  pub preset: Option<serde_json::Value>,
}

impl ComponentInput {
  /// A data input that must hold a value before the component runs.
  pub fn is_mandatory(&self) -> bool {
    !self.is_sequence_input && !self.is_optional_input
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentOutput {
  pub name: String,
  pub is_sequence_output: bool,
  pub is_optional_output: bool,
}

/// A loaded component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
  pub id: ComponentId,
  pub name: String,
  pub component_type: String,
  pub kind: ComponentKind,
  /// False for purely structural nodes.
  pub executable: bool,
  pub inputs: Vec<ComponentInput>,
  pub outputs: Vec<ComponentOutput>,
  pub properties: serde_json::Map<String, serde_json::Value>,
  /// Action flow triggered by a widget.
  pub action: Option<String>,
}

impl Component {
  pub fn input(&self, name: &str) -> Option<&ComponentInput> {
    self.inputs.iter().find(|input| input.name == name)
  }

  pub fn output(&self, name: &str) -> Option<&ComponentOutput> {
    self.outputs.iter().find(|output| output.name == name)
  }

  pub fn has_output(&self, name: &str) -> bool {
    self.output(name).is_some()
  }

  pub fn sequence_inputs(&self) -> impl Iterator<Item = &ComponentInput> {
    self.inputs.iter().filter(|input| input.is_sequence_input)
  }

  pub fn mandatory_inputs(&self) -> impl Iterator<Item = &ComponentInput> {
    self.inputs.iter().filter(|input| input.is_mandatory())
  }

  pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
    self.properties.get(name)
  }

  /// A string property, if present and a string.
  pub fn property_str(&self, name: &str) -> Option<&str> {
    self.properties.get(name).and_then(|value| value.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_kind_resolution() {
    assert_eq!(ComponentKind::resolve("Start", false), ComponentKind::Start);
    assert_eq!(ComponentKind::resolve("CatchErrorAction", false), ComponentKind::CatchError);
    assert_eq!(ComponentKind::resolve("Add", false), ComponentKind::Generic);
    assert_eq!(ComponentKind::resolve("Start", true), ComponentKind::Widget);
  }

  #[test]
  fn test_implicit_sequence_input() {
    assert!(ComponentKind::Generic.takes_sequence_input());
    assert!(ComponentKind::CallAction.takes_sequence_input());
    assert!(!ComponentKind::Start.takes_sequence_input());
    assert!(!ComponentKind::CatchError.takes_sequence_input());
  }
}
