//! Flow state creation, flow startup and action dispatch.

use std::sync::Arc;

use sequin_flow::{ComponentId, ComponentKind, FlowId, SEQOUT_OUTPUT};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::Runtime;
use crate::error::{ComponentError, RuntimeError};
use crate::flow_state::{FlowState, FlowStateId};
use crate::logs::{LogItemType, LogKind};

impl Runtime {
  /// Add a flow state for `flow` to the arena. The caller registers it as
  /// a root or as a child.
  pub(crate) fn create_flow_state(
    &mut self,
    flow: FlowId,
    parent: Option<FlowStateId>,
    component: Option<ComponentId>,
  ) -> FlowStateId {
    let parent_scope = match parent {
      Some(parent) => self.flow_states[parent.0].scope,
      None => self.data_context.global_scope(),
    };
    let project = Arc::clone(&self.project);
    let scope = self
      .data_context
      .create_with_local_variables(parent_scope, &project.flow(flow).local_variables);

    let id = FlowStateId(self.flow_states.len());
    self
      .flow_states
      .push(FlowState::new(id, flow, parent, component, scope));
    id
  }

  fn register_child(&mut self, parent: FlowStateId, child: FlowStateId) {
    self.flow_states[parent.0].children.push(child);
  }

  /// Visit every component of the flow once and queue the ready ones.
  /// Ready widgets run immediately.
  pub fn start_flow(&mut self, flow_state: FlowStateId) {
    let project = Arc::clone(&self.project);
    let flow = project.flow(self.flow_states[flow_state.0].flow);

    for component in &flow.components {
      self.component_state_mut(flow_state, component);
      if !self.is_ready_to_run(flow_state, component.id) {
        continue;
      }

      if component.kind == ComponentKind::Widget {
        self.flow_states[flow_state.0].num_active_components += 1;
        self.run(flow_state, component.id, None);
      } else {
        self.push_task(flow_state, component.id, None);
      }
    }
  }

  /// Start a top-level action by flow name.
  pub fn start_action(&mut self, name: &str) -> Result<FlowStateId, RuntimeError> {
    if self.is_stopped() {
      return Err(RuntimeError::Stopped);
    }

    let project = Arc::clone(&self.project);
    let flow = project
      .flow_by_name(name)
      .ok_or_else(|| RuntimeError::FlowNotFound(name.to_string()))?;
    if !flow.is_action() {
      return Err(RuntimeError::NotAnAction(name.to_string()));
    }

    let id = self.create_flow_state(flow.id, None, None);
    self.root_flow_states.push(id);
    info!(action = %flow.name, flow_state = %self.flow_states[id.0].uid, "action started");

    self.execute_start_action(id);
    Ok(id)
  }

  /// Queue the Start component of an action flow state. An action without
  /// one stops the runtime.
  pub(crate) fn execute_start_action(&mut self, flow_state: FlowStateId) {
    let project = Arc::clone(&self.project);
    let flow = project.flow(self.flow_states[flow_state.0].flow);

    let item = self.log_item(
      LogItemType::Debug,
      LogKind::ActionStart,
      format!("Action {} start", flow.name),
      flow_state,
      self.flow_states[flow_state.0].component,
    );
    self.add_log(item);

    match flow.start_component() {
      Some(start) => self.push_task(flow_state, start.id, None),
      None => self.no_start_action_component(flow_state),
    }
  }

  fn no_start_action_component(&mut self, flow_state: FlowStateId) {
    let item = self.log_item(
      LogItemType::Error,
      LogKind::NoStartActionComponent,
      "No Start action component",
      flow_state,
      None,
    );
    self.add_log(item);
    self.stop_runtime_with_error("No Start action component".to_string());
  }

  /// Run action `name` for a calling component.
  ///
  /// The child flow state is started like any flow, then each Input
  /// component of the action receives the caller's input of the same name.
  pub(crate) fn call_action(
    &mut self,
    caller_flow_state: FlowStateId,
    caller: ComponentId,
    name: &str,
  ) -> Result<FlowStateId, ComponentError> {
    let project = Arc::clone(&self.project);
    let action = project
      .action(name)
      .ok_or_else(|| ComponentError::failed(format!("action '{name}' not found")))?;

    let child = self.create_flow_state(action.id, Some(caller_flow_state), Some(caller));
    let item = self.log_item(
      LogItemType::Debug,
      LogKind::ActionStart,
      format!("Action {} start", action.name),
      child,
      Some(caller),
    );
    self.add_log(item);
    self.register_child(caller_flow_state, child);

    if action.start_component().is_none() {
      self.no_start_action_component(child);
      return Ok(child);
    }

    self.start_flow(child);

    for input in action.components_of_kind(ComponentKind::Input) {
      let argument = self
        .component_state(caller_flow_state, caller)
        .and_then(|state| state.input(&input.name))
        .cloned();
      if let Some(value) = argument {
        self.propagate_value(child, input.id, SEQOUT_OUTPUT, value);
      }
    }

    Ok(child)
  }

  /// Dispatch a widget's action.
  ///
  /// `indexes` are the loop iterator indexes the widget was triggered
  /// under; they shape the emitted value. A widget with an `action` output
  /// propagates through it; a widget naming an action runs it in a new
  /// child flow state.
  pub fn execute_widget_action(
    &mut self,
    component: ComponentId,
    value: Option<Value>,
    indexes: &[usize],
  ) -> Result<(), RuntimeError> {
    if self.is_stopped() {
      return Err(RuntimeError::Stopped);
    }

    let project = Arc::clone(&self.project);
    let widget = project
      .flows()
      .get(component.flow.0)
      .and_then(|flow| flow.components.get(component.index))
      .ok_or_else(|| RuntimeError::ComponentNotFound(format!("{component:?}")))?;
    if widget.kind != ComponentKind::Widget {
      return Err(RuntimeError::NotAWidget(project.component_path(component)));
    }

    let parent = self
      .find_widget_flow_state(component.flow)
      .ok_or_else(|| RuntimeError::NoLiveFlowState(project.flow_path(component.flow)))?;
    let output_value = widget_output_value(value, indexes);

    if widget.has_output("action") {
      self.propagate_value(parent, component, "action", output_value);
      return Ok(());
    }

    let Some(action_name) = &widget.action else {
      let item = self.log_item(
        LogItemType::Error,
        LogKind::WidgetActionNotDefined,
        "Widget action not defined",
        parent,
        Some(component),
      );
      self.add_log(item);
      return Ok(());
    };

    let Some(action) = project.action(action_name) else {
      warn!(action = %action_name, widget = %project.component_path(component), "widget action not found");
      let item = self.log_item(
        LogItemType::Error,
        LogKind::WidgetActionNotFound {
          action: action_name.clone(),
        },
        format!("Widget action \"{action_name}\" not found"),
        parent,
        Some(component),
      );
      self.add_log(item);
      return Ok(());
    };

    let child = self.create_flow_state(action.id, Some(parent), None);
    let item = self.log_item(
      LogItemType::Debug,
      LogKind::ExecuteWidgetAction,
      format!("Execute widget action {}", action.name),
      child,
      Some(component),
    );
    self.add_log(item);

    if let Some(input) = action.components_of_kind(ComponentKind::Input).next() {
      self.propagate_value(child, input.id, SEQOUT_OUTPUT, output_value);
    }

    self.register_child(parent, child);
    self.execute_start_action(child);
    Ok(())
  }

  /// The selected flow state if it runs `flow`, else the first live one.
  fn find_widget_flow_state(&self, flow: FlowId) -> Option<FlowStateId> {
    if let Some(selected) = self.selected_flow_state {
      if let Some(state) = self.flow_state(selected) {
        if !state.is_finished && state.flow == flow {
          return Some(selected);
        }
      }
    }
    self.flow_state_for_flow(flow)
  }
}

fn widget_output_value(value: Option<Value>, indexes: &[usize]) -> Value {
  match (indexes, value) {
    ([], value) => value.unwrap_or(Value::Null),
    ([index], Some(value)) => json!({ "value": value, "index": index }),
    ([index], None) => json!(index),
    (indexes, Some(value)) => json!({ "value": value, "indexes": indexes }),
    (indexes, None) => json!(indexes),
  }
}
