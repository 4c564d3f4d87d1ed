use std::collections::HashMap;

use sequin_config::{FlowKind, VariableDef};
use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentId, ComponentKind};
use crate::graph::Graph;

/// Identifies a flow within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId(pub usize);

/// Identifies a connection line within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionLineId {
  pub flow: FlowId,
  pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineTarget {
  pub component: ComponentId,
  pub input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionLine {
  pub id: ConnectionLineId,
  pub source: ComponentId,
  pub output: String,
  /// `None` for a dangling line.
  pub target: Option<LineTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
  pub name: String,
  pub default_value: serde_json::Value,
  pub persistent: bool,
}

impl From<&VariableDef> for Variable {
  fn from(def: &VariableDef) -> Self {
    Self {
      name: def.name.clone(),
      default_value: def.default_value.clone(),
      persistent: def.persistent,
    }
  }
}

/// A loaded flow: its components, connection lines and local variables.
#[derive(Debug, Clone)]
pub struct Flow {
  pub id: FlowId,
  pub name: String,
  pub kind: FlowKind,
  pub components: Vec<Component>,
  pub connection_lines: Vec<ConnectionLine>,
  pub local_variables: Vec<Variable>,
  pub(crate) graph: Graph,
  pub(crate) component_index: HashMap<String, usize>,
}

impl Flow {
  pub fn is_action(&self) -> bool {
    self.kind == FlowKind::Action
  }

  pub fn component(&self, index: usize) -> &Component {
    &self.components[index]
  }

  pub fn component_by_name(&self, name: &str) -> Option<&Component> {
    self
      .component_index
      .get(name)
      .map(|index| &self.components[*index])
  }

  pub fn connection_line(&self, index: usize) -> &ConnectionLine {
    &self.connection_lines[index]
  }

  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  /// Lines leaving `component` through `output`, in declaration order.
  pub fn lines_from<'a>(
    &'a self,
    component: ComponentId,
    output: &'a str,
  ) -> impl Iterator<Item = &'a ConnectionLine> + 'a {
    self
      .graph
      .outgoing(component.index)
      .iter()
      .map(|index| &self.connection_lines[*index])
      .filter(move |line| line.output == output)
  }

  /// Lines arriving at `component` through `input`, in declaration order.
  pub fn lines_into<'a>(
    &'a self,
    component: ComponentId,
    input: &'a str,
  ) -> impl Iterator<Item = &'a ConnectionLine> + 'a {
    self
      .graph
      .incoming(component.index)
      .iter()
      .map(|index| &self.connection_lines[*index])
      .filter(move |line| line.target.as_ref().is_some_and(|target| target.input == input))
  }

  /// Whether any line delivers into one of the component's sequence inputs.
  pub fn has_connected_sequence_input(&self, component: &Component) -> bool {
    component
      .sequence_inputs()
      .any(|input| self.lines_into(component.id, &input.name).next().is_some())
  }

  pub fn components_of_kind(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
    self
      .components
      .iter()
      .filter(move |component| component.kind == kind)
  }

  pub fn start_component(&self) -> Option<&Component> {
    self.components_of_kind(ComponentKind::Start).next()
  }

  pub fn catch_error_component(&self) -> Option<&Component> {
    self.components_of_kind(ComponentKind::CatchError).next()
  }

  pub fn local_variable(&self, name: &str) -> Option<&Variable> {
    self
      .local_variables
      .iter()
      .find(|variable| variable.name == name)
  }
}
