//! Error routing.

use std::sync::Arc;

use sequin_flow::{ComponentId, ComponentKind, ERROR_OUTPUT};
use serde_json::Value;
use tracing::info;

use super::Runtime;
use crate::flow_state::FlowStateId;
use crate::logs::{LogItemType, LogKind};

impl Runtime {
  /// Route a component failure.
  ///
  /// The message goes through the component's own `@error` output if it is
  /// connected. Otherwise the nearest catch component up the flow state
  /// chain receives it and the failing flow state's queued work is dropped.
  /// With no handler anywhere the runtime stops with the error.
  pub fn throw_error(&mut self, flow_state: FlowStateId, component: ComponentId, message: String) {
    let project = Arc::clone(&self.project);
    let failing = project.component(component);

    self.flow_states[flow_state.0].error = Some(message.clone());
    self.error = Some(message.clone());

    let item = if failing.kind == ComponentKind::Error {
      self.log_item(
        LogItemType::Error,
        LogKind::User,
        format!("Error: {message}"),
        flow_state,
        Some(component),
      )
    } else {
      self.log_item(
        LogItemType::Error,
        LogKind::ExecutionError,
        message.clone(),
        flow_state,
        Some(component),
      )
    };
    self.add_log(item);

    let has_error_line = project
      .flow(component.flow)
      .lines_from(component, ERROR_OUTPUT)
      .any(|line| line.target.is_some());
    if has_error_line && !self.flow_states[flow_state.0].is_finished {
      self.propagate_value(flow_state, component, ERROR_OUTPUT, Value::String(message));
      return;
    }

    let search_from = if failing.kind == ComponentKind::Error {
      self.flow_states[flow_state.0].parent
    } else {
      Some(flow_state)
    };

    match search_from.and_then(|start| self.find_catch_error_component(start)) {
      Some((catch_flow_state, catch_component)) => {
        self.remove_queue_tasks_for_flow_state(flow_state);

        let is_call = self.flow_states[flow_state.0].parent.is_some();
        if catch_flow_state != flow_state && is_call {
          self.finish_flow_state(flow_state);
        }

        info!(
          component = %project.component_path(component),
          catch = %project.component_path(catch_component),
          "error caught"
        );
        self.set_input_value(
          catch_flow_state,
          catch_component,
          "message",
          Value::String(message),
          None,
        );
      }
      None => self.stop_runtime_with_error(message),
    }
  }

  /// Walk up from `start` to the first flow state whose flow has a catch
  /// component.
  fn find_catch_error_component(&self, start: FlowStateId) -> Option<(FlowStateId, ComponentId)> {
    let mut current = Some(start);
    while let Some(id) = current {
      let flow_state = &self.flow_states[id.0];
      if let Some(catch) = self.project.flow(flow_state.flow).catch_error_component() {
        return Some((id, catch.id));
      }
      current = flow_state.parent;
    }
    None
  }
}
