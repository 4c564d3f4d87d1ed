use std::collections::HashMap;

use sequin_config::{ComponentDef, FlowDef, FlowKind, ProjectDef};

use crate::component::{
  Component, ComponentId, ComponentInput, ComponentKind, ComponentOutput, ERROR_OUTPUT,
  SEQIN_INPUT, SEQOUT_OUTPUT,
};
use crate::error::FlowError;
use crate::flow::{ConnectionLine, ConnectionLineId, Flow, FlowId, LineTarget, Variable};
use crate::graph::Graph;

/// A loaded project ready for execution.
#[derive(Debug, Clone)]
pub struct Project {
  pub name: String,
  pub global_variables: Vec<Variable>,
  flows: Vec<Flow>,
  flow_index: HashMap<String, FlowId>,
}

impl Project {
  /// Validate a definition and build the indexed project.
  pub fn load(def: ProjectDef) -> Result<Self, FlowError> {
    let mut flows = Vec::with_capacity(def.flows.len());
    let mut flow_index = HashMap::new();

    for (index, flow_def) in def.flows.iter().enumerate() {
      let id = FlowId(index);
      if flow_index.insert(flow_def.name.clone(), id).is_some() {
        return Err(FlowError::DuplicateFlow(flow_def.name.clone()));
      }
      flows.push(load_flow(id, flow_def)?);
    }

    Ok(Self {
      name: def.name,
      global_variables: def.global_variables.iter().map(Variable::from).collect(),
      flows,
      flow_index,
    })
  }

  /// Parse and load a JSON project definition.
  pub fn from_json(json: &str) -> Result<Self, FlowError> {
    let def: ProjectDef = serde_json::from_str(json).map_err(|e| FlowError::Parse {
      message: e.to_string(),
    })?;
    Self::load(def)
  }

  pub fn flows(&self) -> &[Flow] {
    &self.flows
  }

  pub fn flow(&self, id: FlowId) -> &Flow {
    &self.flows[id.0]
  }

  pub fn flow_by_name(&self, name: &str) -> Option<&Flow> {
    self.flow_index.get(name).map(|id| self.flow(*id))
  }

  /// Look up an action flow by name.
  pub fn action(&self, name: &str) -> Option<&Flow> {
    self.flow_by_name(name).filter(|flow| flow.is_action())
  }

  pub fn pages(&self) -> impl Iterator<Item = &Flow> {
    self
      .flows
      .iter()
      .filter(|flow| flow.kind == FlowKind::Page)
  }

  pub fn component(&self, id: ComponentId) -> &Component {
    self.flow(id.flow).component(id.index)
  }

  pub fn connection_line(&self, id: ConnectionLineId) -> &ConnectionLine {
    self.flow(id.flow).connection_line(id.index)
  }

  pub fn global_variable(&self, name: &str) -> Option<&Variable> {
    self
      .global_variables
      .iter()
      .find(|variable| variable.name == name)
  }
}

fn load_flow(id: FlowId, def: &FlowDef) -> Result<Flow, FlowError> {
  let mut components = Vec::with_capacity(def.components.len());
  let mut component_index = HashMap::new();

  for (index, component_def) in def.components.iter().enumerate() {
    if component_index
      .insert(component_def.name.clone(), index)
      .is_some()
    {
      return Err(FlowError::DuplicateComponent {
        flow: def.name.clone(),
        component: component_def.name.clone(),
      });
    }
    components.push(load_component(ComponentId { flow: id, index }, component_def));
  }

  let lookup = |name: &str| -> Result<usize, FlowError> {
    component_index
      .get(name)
      .copied()
      .ok_or_else(|| FlowError::UnknownComponent {
        flow: def.name.clone(),
        component: name.to_string(),
      })
  };

  let mut connection_lines = Vec::with_capacity(def.connection_lines.len());
  for (index, line_def) in def.connection_lines.iter().enumerate() {
    let source = lookup(&line_def.source)?;
    let source_component: &Component = &components[source];
    if !source_component.has_output(&line_def.output) {
      return Err(FlowError::UnknownOutput {
        flow: def.name.clone(),
        component: line_def.source.clone(),
        output: line_def.output.clone(),
      });
    }

    let target = match (&line_def.target, &line_def.input) {
      (Some(target_name), Some(input)) => {
        let target = lookup(target_name)?;
        if components[target].input(input).is_none() {
          return Err(FlowError::UnknownInput {
            flow: def.name.clone(),
            component: target_name.clone(),
            input: input.clone(),
          });
        }
        Some(LineTarget {
          component: ComponentId { flow: id, index: target },
          input: input.clone(),
        })
      }
      (Some(_), None) => {
        return Err(FlowError::MissingTargetInput {
          flow: def.name.clone(),
          source_component: line_def.source.clone(),
        });
      }
      (None, _) => None,
    };

    connection_lines.push(ConnectionLine {
      id: ConnectionLineId { flow: id, index },
      source: ComponentId { flow: id, index: source },
      output: line_def.output.clone(),
      target,
    });
  }

  let edges: Vec<(usize, Option<usize>)> = connection_lines
    .iter()
    .map(|line| {
      (
        line.source.index,
        line.target.as_ref().map(|target| target.component.index),
      )
    })
    .collect();
  let graph = Graph::new(components.len(), &edges);

  Ok(Flow {
    id,
    name: def.name.clone(),
    kind: def.kind,
    components,
    connection_lines,
    local_variables: def.local_variables.iter().map(Variable::from).collect(),
    graph,
    component_index,
  })
}

fn load_component(id: ComponentId, def: &ComponentDef) -> Component {
  let kind = ComponentKind::resolve(&def.component_type, def.widget);

  let mut inputs: Vec<ComponentInput> = def
    .inputs
    .iter()
    .map(|input| ComponentInput {
      name: input.name.clone(),
      is_sequence_input: input.sequence,
      is_optional_input: input.optional,
      preset: input.value.clone(),
    })
    .collect();

  let mut outputs: Vec<ComponentOutput> = def
    .outputs
    .iter()
    .map(|output| ComponentOutput {
      name: output.name.clone(),
      is_sequence_output: output.sequence,
      is_optional_output: output.optional,
    })
    .collect();

  if def.executable
    && kind.takes_sequence_input()
    && !inputs.iter().any(|input| input.name == SEQIN_INPUT)
  {
    inputs.insert(
      0,
      ComponentInput {
        name: SEQIN_INPUT.to_string(),
        is_sequence_input: true,
        is_optional_input: true,
        preset: None,
      },
    );
  }

  for (name, is_sequence_output) in [(SEQOUT_OUTPUT, true), (ERROR_OUTPUT, false)] {
    if !outputs.iter().any(|output| output.name == name) {
      outputs.push(ComponentOutput {
        name: name.to_string(),
        is_sequence_output,
        is_optional_output: true,
      });
    }
  }

  Component {
    id,
    name: def.name.clone(),
    component_type: def.component_type.clone(),
    kind,
    executable: def.executable,
    inputs,
    outputs,
    properties: def.properties.clone(),
    action: def.action.clone(),
  }
}
