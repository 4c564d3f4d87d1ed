use serde::{Deserialize, Serialize};

use crate::component::ComponentDef;
use crate::project::VariableDef;

/// Whether a flow backs a page (runs for the whole session) or an action
/// (called, and finishes once it has no more work).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
  Page,
  Action,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDef {
  pub name: String,
  pub kind: FlowKind,
  #[serde(default)]
  pub components: Vec<ComponentDef>,
  #[serde(default)]
  pub connection_lines: Vec<ConnectionLineDef>,
  #[serde(default)]
  pub local_variables: Vec<VariableDef>,
}

/// A directed edge from a component output to a component input.
///
/// `target` and `input` may be omitted for a dangling line; such lines are
/// kept in the graph but never carry values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionLineDef {
  pub source: String,
  pub output: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub input: Option<String>,
}
