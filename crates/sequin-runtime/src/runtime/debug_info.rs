//! Debug-info snapshots.
//!
//! A snapshot references flows, components and connection lines by their
//! string paths, so it can be restored against a freshly loaded project.
//! Entries whose path no longer resolves are reported and skipped.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::Runtime;
use crate::error::RuntimeError;
use crate::flow_state::FlowStateId;
use crate::logs::LogItem;
use crate::queue::{QueueTask, QueueTaskId};
use crate::settings::io_error;
use crate::state::{RuntimeState, UiMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
  pub state: RuntimeState,
  pub error: Option<String>,
  pub next_queue_task_id: u64,
  pub flow_states: Vec<FlowStateInfo>,
  pub queue: Vec<QueueTaskInfo>,
  pub logs: Vec<LogItem>,
  #[serde(default)]
  pub global_variables: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowStateInfo {
  pub id: String,
  pub flow: String,
  pub component: Option<String>,
  pub error: Option<String>,
  pub is_finished: bool,
  pub num_active_components: usize,
  #[serde(default)]
  pub local_variables: BTreeMap<String, Value>,
  #[serde(default)]
  pub component_states: Vec<ComponentStateInfo>,
  #[serde(default)]
  pub flow_states: Vec<FlowStateInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStateInfo {
  pub component: String,
  pub inputs_data: BTreeMap<String, Value>,
  #[serde(default)]
  pub unread_inputs: Vec<String>,
  #[serde(default)]
  pub is_running: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueTaskInfo {
  pub id: u64,
  pub flow_state: String,
  pub component: String,
  pub connection_line: Option<String>,
}

impl DebugInfo {
  /// Read a snapshot from a JSON file.
  pub fn read(path: &Path) -> Result<Self, RuntimeError> {
    let text = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    serde_json::from_str(&text).map_err(|e| RuntimeError::InvalidDocument {
      message: format!("debug info '{}': {e}", path.display()),
    })
  }

  /// Write the snapshot as pretty JSON.
  pub fn write(&self, path: &Path) -> Result<(), RuntimeError> {
    let text = serde_json::to_string_pretty(self).map_err(|e| RuntimeError::InvalidDocument {
      message: e.to_string(),
    })?;
    std::fs::write(path, text).map_err(|e| io_error(path, e))
  }
}

impl Runtime {
  /// Snapshot the whole runtime.
  pub fn debug_info(&self) -> DebugInfo {
    let global = self.data_context.global_scope();
    DebugInfo {
      state: self.state,
      error: self.error.clone(),
      next_queue_task_id: self.queue.last_id() + 1,
      flow_states: self
        .root_flow_states
        .iter()
        .map(|id| self.flow_state_info(*id))
        .collect(),
      queue: self
        .queue
        .iter()
        .map(|task| QueueTaskInfo {
          id: task.id.0,
          flow_state: self.flow_states[task.flow_state.0].uid.clone(),
          component: self.project.component_path(task.component),
          connection_line: task
            .connection_line
            .map(|line| self.project.connection_line_path(line)),
        })
        .collect(),
      logs: self.logs.items().to_vec(),
      global_variables: self.data_context.scope_values(global),
    }
  }

  fn flow_state_info(&self, id: FlowStateId) -> FlowStateInfo {
    let state = &self.flow_states[id.0];
    FlowStateInfo {
      id: state.uid.clone(),
      flow: self.project.flow_path(state.flow),
      component: state
        .component
        .map(|component| self.project.component_path(component)),
      error: state.error.clone(),
      is_finished: state.is_finished,
      num_active_components: state.num_active_components,
      local_variables: self.data_context.scope_values(state.scope),
      component_states: state
        .component_states()
        .map(|component_state| ComponentStateInfo {
          component: self.project.component_path(component_state.component),
          inputs_data: component_state.inputs().clone(),
          unread_inputs: component_state.unread_inputs().iter().cloned().collect(),
          is_running: component_state.is_running(),
        })
        .collect(),
      flow_states: state
        .children
        .iter()
        .map(|child| self.flow_state_info(*child))
        .collect(),
    }
  }

  /// Replace the runtime's state with a snapshot.
  ///
  /// The runtime ends up paused with the debugger active, or stopped if the
  /// snapshot was taken after a stop. Outstanding work is not part of a
  /// snapshot; current work is disposed.
  pub fn restore_debug_info(&mut self, info: DebugInfo) {
    for id in self.root_flow_states.clone() {
      self.finish_flow_state(id);
    }
    self.flow_states.clear();
    self.root_flow_states.clear();
    self.queue.clear();
    self.data_context.clear();

    let global = self.data_context.global_scope();
    for (name, value) in info.global_variables {
      self.data_context.set(global, &name, value);
    }

    for flow_state in &info.flow_states {
      if let Some(id) = self.restore_flow_state(flow_state, None) {
        self.root_flow_states.push(id);
      }
    }

    let project = Arc::clone(&self.project);
    for task in &info.queue {
      let Some(flow_state) = self.find_flow_state_by_id(&task.flow_state) else {
        error!(flow_state = %task.flow_state, "can't find flow state of queue task");
        continue;
      };
      let Some(component) = project.resolve_component_path(&task.component) else {
        error!(component = %task.component, "can't find component of queue task");
        continue;
      };
      let connection_line = match &task.connection_line {
        Some(path) => {
          let Some(line) = project.resolve_connection_line_path(path) else {
            error!(connection_line = %path, "can't find connection line of queue task");
            continue;
          };
          Some(line)
        }
        None => None,
      };
      self.queue.push_existing(QueueTask {
        id: QueueTaskId(task.id),
        flow_state,
        component,
        connection_line,
      });
    }
    self
      .queue
      .reserve_ids(info.next_queue_task_id.saturating_sub(1));

    self.logs.restore(info.logs);

    self.error = info.error;
    self.state = if info.state == RuntimeState::Stopped {
      RuntimeState::Stopped
    } else {
      RuntimeState::Paused
    };
    self.is_debugger_active = true;
    self.front_face = false;
    self.ui_mode = UiMode::Debugger;
    self.single_step_queue_task = None;
    self.single_step_last_skipped_task = None;
    self.last_breakpoint_task = None;
    self.active_connection_lines.clear();
    self.select_queue_task(self.queue.front().copied());

    info!(
      flow_states = self.flow_states.len(),
      queued = self.queue.len(),
      state = ?self.state,
      "debug info restored"
    );
  }

  fn restore_flow_state(
    &mut self,
    info: &FlowStateInfo,
    parent: Option<FlowStateId>,
  ) -> Option<FlowStateId> {
    let project = Arc::clone(&self.project);
    let Some(flow) = project.resolve_flow_path(&info.flow) else {
      error!(flow = %info.flow, "can't find flow of flow state");
      return None;
    };
    let component = match &info.component {
      Some(path) => {
        let Some(component) = project.resolve_component_path(path) else {
          error!(component = %path, "can't find component of flow state");
          return None;
        };
        Some(component)
      }
      None => None,
    };

    let id = self.create_flow_state(flow, parent, component);
    {
      let state = &mut self.flow_states[id.0];
      state.uid = info.id.clone();
      state.error = info.error.clone();
      state.is_finished = info.is_finished;
      state.num_active_components = info.num_active_components;
    }

    let scope = self.flow_states[id.0].scope;
    for (name, value) in &info.local_variables {
      if !self.data_context.declares(scope, name) {
        warn!(variable = %name, flow = %info.flow, "skipping undeclared local variable");
        continue;
      }
      self.data_context.set(scope, name, value.clone());
    }

    for component_info in &info.component_states {
      let Some(component) = project.resolve_component_path(&component_info.component) else {
        error!(component = %component_info.component, "can't find component of component state");
        continue;
      };
      let state = self.component_state_mut(id, project.component(component));
      state.inputs_data = component_info.inputs_data.clone();
      state.unread_inputs = component_info.unread_inputs.iter().cloned().collect();
    }

    for child in &info.flow_states {
      if let Some(child) = self.restore_flow_state(child, Some(id)) {
        self.flow_states[id.0].children.push(child);
      }
    }

    Some(id)
  }

  pub fn save_debug_info(&self, path: &Path) -> Result<(), RuntimeError> {
    self.debug_info().write(path)
  }

  /// Read a snapshot file and restore it.
  pub fn load_debug_info(&mut self, path: &Path) -> Result<(), RuntimeError> {
    let info = DebugInfo::read(path)?;
    self.restore_debug_info(info);
    Ok(())
  }
}
