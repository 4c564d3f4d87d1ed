//! Components that structure action calls and error handling.

use sequin_flow::SEQOUT_OUTPUT;
use serde_json::Value;

use crate::context::{ComponentExecutor, Execution, ExecutionContext};
use crate::error::ComponentError;
use crate::expression::value_to_string;

/// Entry point of an action.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartComponent;

impl ComponentExecutor for StartComponent {
  fn execute(&self, _ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    Ok(Execution::Completed)
  }
}

/// Continues the calling component's sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndComponent;

impl ComponentExecutor for EndComponent {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    let flow_state = ctx.flow_state();
    if let Some((parent, caller)) = ctx.runtime().caller_of(flow_state) {
      ctx
        .runtime()
        .propagate_value(parent, caller, SEQOUT_OUTPUT, Value::Null);
    }
    Ok(Execution::Completed)
  }
}

/// Returns its `value` input through the calling component's output named
/// by the `name` property.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputComponent;

impl ComponentExecutor for OutputComponent {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    let value = ctx.require_input("value")?;
    let output = match ctx.property_str("name") {
      Ok(name) => name.to_string(),
      Err(_) => ctx.component().name.clone(),
    };

    let flow_state = ctx.flow_state();
    if let Some((parent, caller)) = ctx.runtime().caller_of(flow_state) {
      ctx.runtime().propagate_value(parent, caller, &output, value);
    }
    Ok(Execution::Completed)
  }
}

/// Runs the action named by the `action` property in a child flow state.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallActionComponent;

impl ComponentExecutor for CallActionComponent {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    let action = match ctx.component().action.clone() {
      Some(action) => action,
      None => ctx.property_str("action")?.to_string(),
    };
    let flow_state = ctx.flow_state();
    let component = ctx.component().id;
    ctx.runtime().call_action(flow_state, component, &action)?;
    Ok(Execution::SelfPropagated)
  }
}

/// Receives routed error messages and forwards them through `message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatchErrorComponent;

impl ComponentExecutor for CatchErrorComponent {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    let message = ctx.require_input("message")?;
    if ctx.component().has_output("message") {
      ctx.propagate_value("message", message);
    }
    Ok(Execution::Completed)
  }
}

/// Raises its `message` input (or evaluated `message` property) as an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorComponent;

impl ComponentExecutor for ErrorComponent {
  fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    let message = match ctx.input("message") {
      Some(message) => message,
      None => ctx.eval_property("message")?.unwrap_or(Value::Null),
    };
    Err(ComponentError::failed(value_to_string(&message)))
  }
}
