//! Value propagation, input delivery, expression evaluation and assignment.

use std::sync::Arc;

use sequin_flow::{ComponentId, ConnectionLineId};
use serde_json::Value;

use super::Runtime;
use crate::expression::{self, Assignable, ExpressionError, value_to_string, write_path};
use crate::flow_state::FlowStateId;
use crate::logs::{LogItemType, LogKind};

impl Runtime {
  /// Deliver `value` along every line leaving `output` of `source`.
  ///
  /// All targets receive the value before this returns, in line declaration
  /// order. Targets that become ready are queued.
  pub fn propagate_value(
    &mut self,
    flow_state: FlowStateId,
    source: ComponentId,
    output: &str,
    value: Value,
  ) {
    let project = Arc::clone(&self.project);
    let flow = project.flow(source.flow);

    for line in flow.lines_from(source, output) {
      let Some(target) = &line.target else {
        continue;
      };

      if !self.front_face {
        self.active_connection_lines.insert(line.id);
      }

      let mut item = self.log_item(
        LogItemType::Debug,
        LogKind::OutputValue {
          output: output.to_string(),
          value: value.clone(),
        },
        format!("{output} = {}", value_to_string(&value)),
        flow_state,
        Some(source),
      );
      item = item.with_connection_line(project.connection_line_path(line.id));
      self.add_log(item);

      self.set_input_value(
        flow_state,
        target.component,
        &target.input,
        value.clone(),
        Some(line.id),
      );
    }
  }

  /// Store `value` in an input of `component` and queue the component if it
  /// became ready.
  pub fn set_input_value(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentId,
    input: &str,
    value: Value,
    connection_line: Option<ConnectionLineId>,
  ) {
    let project = Arc::clone(&self.project);
    self
      .component_state_mut(flow_state, project.component(component))
      .set_input_data(input, value);

    if self.is_ready_to_run(flow_state, component) {
      self.push_task(flow_state, component, connection_line);
    }
  }

  /// Evaluate `source` for `component`: identifiers resolve to its inputs,
  /// then to variables visible from the flow state.
  pub fn eval_expression(
    &self,
    flow_state: FlowStateId,
    component: ComponentId,
    source: &str,
  ) -> Result<Value, ExpressionError> {
    expression::evaluate(source, &|name: &str| self.resolve(flow_state, component, name))
  }

  fn resolve(&self, flow_state: FlowStateId, component: ComponentId, name: &str) -> Option<Value> {
    let state = self.flow_state(flow_state)?;
    state
      .component_state(component)
      .and_then(|component_state| component_state.input(name).cloned())
      .or_else(|| self.data_context.get(state.scope, name))
  }

  /// Assign `value` to the assignable expression `target`.
  ///
  /// A bare output name propagates through that output. A bare variable
  /// name writes the variable (local before global). A variable followed by
  /// accessors writes into the value held by that variable.
  pub fn assign_value(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentId,
    target: &str,
    value: Value,
  ) -> Result<(), ExpressionError> {
    let assignable = Assignable::parse(target)?;
    let project = Arc::clone(&self.project);
    let scope = self.flow_states[flow_state.0].scope;

    if assignable.accessors.is_empty() {
      let root = assignable.root.as_str();
      if project.component(component).has_output(root) {
        self.propagate_value(flow_state, component, root, value);
        return Ok(());
      }
      if project.flow(component.flow).local_variable(root).is_some() {
        self.data_context.set(scope, root, value);
        return Ok(());
      }
      if project.global_variable(root).is_some() {
        let global = self.data_context.global_scope();
        self.data_context.set(global, root, value);
        return Ok(());
      }
      return Err(ExpressionError::NotAssignable(target.to_string()));
    }

    let keys = assignable.keys(&|name: &str| self.resolve(flow_state, component, name))?;
    let Some(mut root_value) = self.data_context.get(scope, &assignable.root) else {
      return Err(ExpressionError::NotAssignable(target.to_string()));
    };
    write_path(&mut root_value, &keys, value)?;
    self.data_context.set(scope, &assignable.root, root_value);
    Ok(())
  }
}
