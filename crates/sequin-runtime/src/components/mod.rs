//! Built-in component library.

mod actions;
mod basic;
mod delay;

use sequin_flow::ComponentKind;

use crate::context::{Execution, ExecutionContext};
use crate::error::ComponentError;
use crate::registry::ComponentRegistry;

pub use actions::{
  CallActionComponent, CatchErrorComponent, EndComponent, ErrorComponent, OutputComponent,
  StartComponent,
};
pub use basic::{
  AddComponent, EvaluateComponent, IsTrueComponent, LogComponent, SetVariableComponent,
};
pub use delay::DelayComponent;

pub(crate) fn register_builtins(registry: &mut ComponentRegistry) {
  registry
    .register_kind(ComponentKind::Start, StartComponent)
    .register_kind(ComponentKind::End, EndComponent)
    .register_kind(ComponentKind::Input, input_placeholder)
    .register_kind(ComponentKind::Output, OutputComponent)
    .register_kind(ComponentKind::CallAction, CallActionComponent)
    .register_kind(ComponentKind::CatchError, CatchErrorComponent)
    .register_kind(ComponentKind::Error, ErrorComponent)
    .register_kind(ComponentKind::Widget, widget)
    .register("Log", LogComponent)
    .register("Add", AddComponent)
    .register("Evaluate", EvaluateComponent)
    .register("SetVariable", SetVariableComponent)
    .register("IsTrue", IsTrueComponent)
    .register("Delay", DelayComponent);
}

/// Input components only carry call arguments and are never scheduled.
fn input_placeholder(_ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
  Ok(Execution::SelfPropagated)
}

/// Widgets without a dedicated executor render nothing and fire nothing.
fn widget(_ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
  Ok(Execution::SelfPropagated)
}
