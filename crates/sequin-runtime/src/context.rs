//! What a component body sees while it executes.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use sequin_flow::{Component, ComponentId, Project, SEQOUT_OUTPUT};
use serde_json::Value;

use crate::error::ComponentError;
use crate::expression::ExpressionError;
use crate::flow_state::{ComponentState, FlowStateId};
use crate::logs::LogItemType;
use crate::messages::ComponentHandle;
use crate::operation::AsyncOperation;
use crate::runtime::Runtime;

/// Outcome of one component execution.
pub enum Execution {
  /// Done. `@seqout` is propagated.
  Completed,
  /// The component propagated whatever it wanted itself. `@seqout` is not
  /// propagated and nothing is retained.
  SelfPropagated,
  /// Asynchronous work was started and `@seqout` is propagated now. The
  /// operation is retained until it completes or the flow state finishes.
  Pending(Box<dyn AsyncOperation>),
  /// Like `Pending`, but `@seqout` is left to the asynchronous work.
  Deferred(Box<dyn AsyncOperation>),
}

impl std::fmt::Debug for Execution {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Completed => f.write_str("Completed"),
      Self::SelfPropagated => f.write_str("SelfPropagated"),
      Self::Pending(_) => f.write_str("Pending(..)"),
      Self::Deferred(_) => f.write_str("Deferred(..)"),
    }
  }
}

/// Behavior of one component type.
pub trait ComponentExecutor: Send + Sync {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError>;
}

impl<F> ComponentExecutor for F
where
  F: Fn(&mut ExecutionContext<'_>) -> Result<Execution, ComponentError> + Send + Sync,
{
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    self(ctx)
  }
}

/// Borrowed view of the runtime for one component run.
pub struct ExecutionContext<'a> {
  runtime: &'a mut Runtime,
  project: Arc<Project>,
  flow_state: FlowStateId,
  component: ComponentId,
  previous: Option<Box<dyn AsyncOperation>>,
}

impl<'a> ExecutionContext<'a> {
  pub(crate) fn new(
    runtime: &'a mut Runtime,
    flow_state: FlowStateId,
    component: ComponentId,
    previous: Option<Box<dyn AsyncOperation>>,
  ) -> Self {
    let project = Arc::clone(runtime.project());
    Self {
      runtime,
      project,
      flow_state,
      component,
      previous,
    }
  }

  /// The operation of the previous execution, if it was not taken.
  pub(crate) fn into_previous(self) -> Option<Box<dyn AsyncOperation>> {
    self.previous
  }

  pub(crate) fn runtime(&mut self) -> &mut Runtime {
    self.runtime
  }

  pub fn flow_state(&self) -> FlowStateId {
    self.flow_state
  }

  pub fn component(&self) -> &Component {
    self.project.component(self.component)
  }

  pub fn project(&self) -> &Project {
    &self.project
  }

  fn state(&self) -> Option<&ComponentState> {
    self
      .runtime
      .flow_state(self.flow_state)
      .and_then(|flow_state| flow_state.component_state(self.component))
  }

  fn state_mut(&mut self) -> &mut ComponentState {
    let component = self.project.component(self.component);
    self.runtime.component_state_mut(self.flow_state, component)
  }

  pub fn input(&self, name: &str) -> Option<Value> {
    self.state().and_then(|state| state.input(name)).cloned()
  }

  /// The input's value, or `MissingInput`.
  pub fn require_input(&self, name: &str) -> Result<Value, ComponentError> {
    self
      .input(name)
      .ok_or_else(|| ComponentError::MissingInput(name.to_string()))
  }

  pub fn inputs(&self) -> BTreeMap<String, Value> {
    self
      .state()
      .map(|state| state.inputs().clone())
      .unwrap_or_default()
  }

  pub fn property(&self, name: &str) -> Option<&Value> {
    self.component().property(name)
  }

  /// A property that must be a string.
  pub fn property_str(&self, name: &str) -> Result<&str, ComponentError> {
    self
      .component()
      .property_str(name)
      .ok_or_else(|| ComponentError::InvalidProperty {
        name: name.to_string(),
        message: "expected a string".to_string(),
      })
  }

  pub fn eval_expression(&self, expression: &str) -> Result<Value, ExpressionError> {
    self
      .runtime
      .eval_expression(self.flow_state, self.component, expression)
  }

  /// Evaluate a string property as an expression. Non-string properties are
  /// returned as they are.
  pub fn eval_property(&self, name: &str) -> Result<Option<Value>, ComponentError> {
    match self.property(name) {
      Some(Value::String(expression)) => Ok(Some(self.eval_expression(expression)?)),
      Some(other) => Ok(Some(other.clone())),
      None => Ok(None),
    }
  }

  pub fn assign_value(&mut self, expression: &str, value: Value) -> Result<(), ExpressionError> {
    self
      .runtime
      .assign_value(self.flow_state, self.component, expression, value)
  }

  pub fn propagate_value(&mut self, output: &str, value: Value) {
    self
      .runtime
      .propagate_value(self.flow_state, self.component, output, value);
  }

  pub fn propagate_value_through_seqout(&mut self) {
    self.propagate_value(SEQOUT_OUTPUT, Value::Null);
  }

  pub fn throw_error(&mut self, message: impl Into<String>) {
    self
      .runtime
      .throw_error(self.flow_state, self.component, message.into());
  }

  pub fn log(&mut self, item_type: LogItemType, message: impl Into<String>) {
    self
      .runtime
      .log_user(self.flow_state, self.component, item_type, message.into());
  }

  /// A variable visible from this flow state.
  pub fn variable(&self, name: &str) -> Option<Value> {
    self.runtime.variable(self.flow_state, name)
  }

  /// Keep arbitrary per-component state between runs.
  pub fn set_running_state<T: Any + Send>(&mut self, state: T) {
    self.state_mut().running_state = Some(Box::new(state));
  }

  pub fn running_state<T: Any>(&self) -> Option<&T> {
    self
      .state()
      .and_then(|state| state.running_state.as_ref())
      .and_then(|state| state.downcast_ref::<T>())
  }

  pub fn running_state_mut<T: Any>(&mut self) -> Option<&mut T> {
    self
      .state_mut()
      .running_state
      .as_mut()
      .and_then(|state| state.downcast_mut::<T>())
  }

  pub fn clear_running_state(&mut self) {
    self.state_mut().running_state = None;
  }

  /// Take over the reentrant operation left by the previous execution.
  /// Untaken operations are disposed once this execution returns.
  pub fn take_operation(&mut self) -> Option<Box<dyn AsyncOperation>> {
    self.previous.take()
  }

  /// A handle for asynchronous work to report back through.
  pub fn handle(&self) -> ComponentHandle {
    ComponentHandle::new(self.runtime.sender(), self.flow_state, self.component)
  }
}
