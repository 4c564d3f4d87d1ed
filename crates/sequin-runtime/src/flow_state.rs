use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use sequin_flow::{Component, ComponentId, FlowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data_context::ScopeId;
use crate::operation::AsyncOperation;

/// Index of a flow state in the runtime's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowStateId(pub usize);

/// One running instance of a flow.
///
/// Flow states live in an arena owned by the runtime. `parent` is a lookup
/// index only; ownership goes from a flow state to its `children`.
#[derive(Debug)]
pub struct FlowState {
  pub id: FlowStateId,
  /// Stable identifier used in logs and debug-info.
  pub uid: String,
  pub flow: FlowId,
  pub parent: Option<FlowStateId>,
  /// Component in the parent flow that spawned this flow state.
  pub component: Option<ComponentId>,
  pub children: Vec<FlowStateId>,
  pub scope: ScopeId,
  pub error: Option<String>,
  pub is_finished: bool,
  /// Components currently queued or running.
  pub num_active_components: usize,
  pub(crate) component_states: BTreeMap<ComponentId, ComponentState>,
}

impl FlowState {
  pub(crate) fn new(
    id: FlowStateId,
    flow: FlowId,
    parent: Option<FlowStateId>,
    component: Option<ComponentId>,
    scope: ScopeId,
  ) -> Self {
    Self {
      id,
      uid: uuid::Uuid::new_v4().to_string(),
      flow,
      parent,
      component,
      children: Vec::new(),
      scope,
      error: None,
      is_finished: false,
      num_active_components: 0,
      component_states: BTreeMap::new(),
    }
  }

  pub fn component_state(&self, component: ComponentId) -> Option<&ComponentState> {
    self.component_states.get(&component)
  }

  /// Get or lazily create the state for `component`.
  pub(crate) fn component_state_mut(&mut self, component: &Component) -> &mut ComponentState {
    self
      .component_states
      .entry(component.id)
      .or_insert_with(|| ComponentState::new(component))
  }

  pub fn component_states(&self) -> impl Iterator<Item = &ComponentState> {
    self.component_states.values()
  }

  /// Whether any component has outstanding asynchronous work.
  pub fn has_any_disposable_component(&self) -> bool {
    self
      .component_states
      .values()
      .any(|state| state.operation.is_some())
  }

  pub fn is_running(&self) -> bool {
    self.component_states.values().any(|state| state.is_running)
  }
}

/// Execution record of one component within one flow state.
pub struct ComponentState {
  pub component: ComponentId,
  pub(crate) inputs_data: BTreeMap<String, Value>,
  pub(crate) unread_inputs: BTreeSet<String>,
  pub(crate) is_running: bool,
  pub(crate) operation: Option<Box<dyn AsyncOperation>>,
  pub(crate) running_state: Option<Box<dyn Any + Send>>,
}

impl ComponentState {
  /// New state with preset input values already delivered.
  pub(crate) fn new(component: &Component) -> Self {
    let inputs_data = component
      .inputs
      .iter()
      .filter_map(|input| {
        input
          .preset
          .as_ref()
          .map(|value| (input.name.clone(), value.clone()))
      })
      .collect();

    Self {
      component: component.id,
      inputs_data,
      unread_inputs: BTreeSet::new(),
      is_running: false,
      operation: None,
      running_state: None,
    }
  }

  pub fn input(&self, name: &str) -> Option<&Value> {
    self.inputs_data.get(name)
  }

  pub fn has_input(&self, name: &str) -> bool {
    self.inputs_data.contains_key(name)
  }

  pub fn inputs(&self) -> &BTreeMap<String, Value> {
    &self.inputs_data
  }

  pub fn unread_inputs(&self) -> &BTreeSet<String> {
    &self.unread_inputs
  }

  pub fn is_running(&self) -> bool {
    self.is_running
  }

  pub fn has_operation(&self) -> bool {
    self.operation.is_some()
  }

  /// Running, or waiting on non-reentrant asynchronous work. The scheduler
  /// parks tasks for a busy component.
  pub fn is_busy(&self) -> bool {
    self.is_running
      || self
        .operation
        .as_ref()
        .is_some_and(|operation| !operation.reentrant())
  }

  pub(crate) fn set_input_data(&mut self, name: &str, value: Value) {
    self.inputs_data.insert(name.to_string(), value);
    self.unread_inputs.insert(name.to_string());
  }

  pub(crate) fn clear_sequence_inputs(&mut self, component: &Component) {
    for input in component.sequence_inputs() {
      self.inputs_data.remove(&input.name);
    }
  }

  pub(crate) fn mark_inputs_read(&mut self) {
    self.unread_inputs.clear();
  }

  /// Dispose the outstanding operation, if any.
  pub(crate) fn dispose_operation(&mut self) -> bool {
    match self.operation.take() {
      Some(operation) => {
        operation.dispose();
        true
      }
      None => false,
    }
  }
}

impl fmt::Debug for ComponentState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ComponentState")
      .field("component", &self.component)
      .field("inputs_data", &self.inputs_data)
      .field("unread_inputs", &self.unread_inputs)
      .field("is_running", &self.is_running)
      .field("has_operation", &self.operation.is_some())
      .field("has_running_state", &self.running_state.is_some())
      .finish()
  }
}
