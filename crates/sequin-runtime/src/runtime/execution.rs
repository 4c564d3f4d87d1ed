//! Readiness, component runs and flow state completion.

use std::sync::Arc;

use sequin_flow::{ComponentId, ComponentKind, ConnectionLineId, SEQIN_INPUT, SEQOUT_OUTPUT};
use serde_json::Value;
use tracing::{debug, error};

use super::Runtime;
use crate::context::{Execution, ExecutionContext};
use crate::error::ComponentError;
use crate::expression::is_truthy;
use crate::flow_state::FlowStateId;
use crate::logs::{LogItemType, LogKind};
use crate::operation::AsyncOperation;

impl Runtime {
  /// Whether `component` can run in `flow_state` with the inputs it holds.
  pub fn is_ready_to_run(&self, flow_state: FlowStateId, component: ComponentId) -> bool {
    let project = &self.project;
    let component = project.component(component);
    let Some(state) = self.flow_states[flow_state.0].component_state(component.id) else {
      return false;
    };

    if !component.executable {
      return false;
    }

    match component.kind {
      ComponentKind::Widget => return true,
      ComponentKind::CatchError => {
        return state.input("message").is_some_and(is_truthy);
      }
      _ => {}
    }

    let flow = project.flow(component.id.flow);
    if flow.has_connected_sequence_input(component)
      && !component
        .sequence_inputs()
        .any(|input| state.has_input(&input.name))
    {
      return false;
    }

    if component
      .mandatory_inputs()
      .any(|input| !state.has_input(&input.name))
    {
      return false;
    }

    if component.kind == ComponentKind::Input {
      return false;
    }

    if component.kind == ComponentKind::Start && !self.caller_triggered(flow_state) {
      return false;
    }

    true
  }

  /// For an action's Start: the calling component's `@seqin`, if
  /// connected, must hold data.
  fn caller_triggered(&self, flow_state: FlowStateId) -> bool {
    let Some((parent, caller)) = self.caller_of(flow_state) else {
      return true;
    };
    let parent_flow = self.project.flow(caller.flow);
    if parent_flow.lines_into(caller, SEQIN_INPUT).next().is_none() {
      return true;
    }
    self.flow_states[parent.0]
      .component_state(caller)
      .is_some_and(|state| state.has_input(SEQIN_INPUT))
  }

  /// Execute one component and apply its outcome.
  pub(crate) fn run(
    &mut self,
    flow_state: FlowStateId,
    component_id: ComponentId,
    connection_line: Option<ConnectionLineId>,
  ) {
    let project = Arc::clone(&self.project);
    let component = project.component(component_id);

    if self.flow_states[flow_state.0].is_finished {
      debug!(
        flow_state = %self.flow_states[flow_state.0].uid,
        component = %project.component_path(component_id),
        "running component in finished flow state"
      );
    }

    let mut item = self.log_item(
      LogItemType::Debug,
      LogKind::Execute,
      format!("Execute component {}", component.name),
      flow_state,
      Some(component_id),
    );
    if let Some(line) = connection_line {
      item = item.with_connection_line(project.connection_line_path(line));
    }
    self.add_log(item);

    let previous = {
      let state = self.component_state_mut(flow_state, component);
      state.is_running = true;
      if state
        .operation
        .as_ref()
        .is_some_and(|operation| operation.reentrant())
      {
        state.operation.take()
      } else {
        None
      }
    };

    let (result, leftover) = match self.registry.executor_for(component) {
      Some(executor) => {
        let mut ctx = ExecutionContext::new(self, flow_state, component_id, previous);
        let result = executor.execute(&mut ctx);
        (result, ctx.into_previous())
      }
      None => (
        Err(ComponentError::failed(format!(
          "no executor for component type '{}'",
          component.component_type
        ))),
        previous,
      ),
    };

    if let Some(operation) = leftover {
      operation.dispose();
    }

    let propagate = match result {
      Ok(Execution::Completed) => {
        self.replace_operation(flow_state, component_id, None);
        true
      }
      Ok(Execution::SelfPropagated) => {
        self.replace_operation(flow_state, component_id, None);
        false
      }
      Ok(Execution::Pending(operation)) => {
        self.replace_operation(flow_state, component_id, Some(operation));
        true
      }
      Ok(Execution::Deferred(operation)) => {
        self.replace_operation(flow_state, component_id, Some(operation));
        false
      }
      Err(e) if e.is_fatal() => {
        let message = e.to_string();
        error!(
          component = %project.component_path(component_id),
          error = %message,
          "fatal component error"
        );
        let item = self.log_item(
          LogItemType::Fatal,
          LogKind::ExecutionError,
          message.clone(),
          flow_state,
          Some(component_id),
        );
        self.add_log(item);
        self.flow_states[flow_state.0].error = Some(message.clone());
        self.stop_runtime_with_error(message);
        false
      }
      Err(e) => {
        self.throw_error(flow_state, component_id, e.to_string());
        false
      }
    };

    {
      let state = &mut self.flow_states[flow_state.0];
      state.num_active_components = state.num_active_components.saturating_sub(1);
      if let Some(component_state) = state.component_states.get_mut(&component_id) {
        component_state.is_running = false;
      }
    }

    if propagate {
      self.propagate_value(flow_state, component_id, SEQOUT_OUTPUT, Value::Null);
    }

    if let Some(state) = self.flow_states[flow_state.0]
      .component_states
      .get_mut(&component_id)
    {
      state.clear_sequence_inputs(component);
      state.mark_inputs_read();
    }

    if propagate && !self.flow_states[flow_state.0].has_any_disposable_component() {
      self.check_flow_state_finished(flow_state);
    }
  }

  /// Store the outcome's operation, disposing one still held from before.
  fn replace_operation(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentId,
    operation: Option<Box<dyn AsyncOperation>>,
  ) {
    if let Some(state) = self.flow_states[flow_state.0]
      .component_states
      .get_mut(&component)
    {
      state.dispose_operation();
      state.operation = operation;
    } else if let Some(operation) = operation {
      operation.dispose();
    }
  }

  /// Asynchronous work of `component` reported completion.
  pub(crate) fn complete_operation(&mut self, flow_state: FlowStateId, component: ComponentId) {
    let disposed = self.flow_states[flow_state.0]
      .component_states
      .get_mut(&component)
      .is_some_and(|state| state.dispose_operation());

    if !disposed {
      debug!(
        component = %self.project.component_path(component),
        "completion without outstanding work"
      );
      return;
    }

    if !self.flow_states[flow_state.0].has_any_disposable_component() {
      self.check_flow_state_finished(flow_state);
    }
  }

  /// Finish an action flow state once it has no active components and all
  /// its children are finished.
  pub(crate) fn check_flow_state_finished(&mut self, flow_state: FlowStateId) {
    let state = &self.flow_states[flow_state.0];
    if state.is_finished
      || state.num_active_components != 0
      || !self.project.flow(state.flow).is_action()
    {
      return;
    }
    if state
      .children
      .iter()
      .any(|child| !self.flow_states[child.0].is_finished)
    {
      return;
    }

    self.finish_flow_state(flow_state);

    // A finished child may complete its parent.
    if let Some(parent) = self.flow_states[flow_state.0].parent {
      if !self.flow_states[parent.0].has_any_disposable_component() {
        self.check_flow_state_finished(parent);
      }
    }
  }

  /// Finish a flow state and its children, disposing outstanding work.
  /// Finishing an already finished flow state does nothing.
  pub fn finish_flow_state(&mut self, flow_state: FlowStateId) {
    if self.flow_states[flow_state.0].is_finished {
      return;
    }

    for child in self.flow_states[flow_state.0].children.clone() {
      self.finish_flow_state(child);
    }

    let state = &mut self.flow_states[flow_state.0];
    let disposed = state
      .component_states
      .values_mut()
      .map(|component_state| component_state.dispose_operation())
      .filter(|disposed| *disposed)
      .count();
    state.is_finished = true;

    debug!(flow_state = %state.uid, disposed, "flow state finished");

    if self.project.flow(state.flow).is_action() {
      let name = self.project.flow(state.flow).name.clone();
      let item = self.log_item(
        LogItemType::Debug,
        LogKind::ActionEnd,
        format!("Action {name} finished"),
        flow_state,
        self.flow_states[flow_state.0].component,
      );
      self.add_log(item);
    }
  }
}
