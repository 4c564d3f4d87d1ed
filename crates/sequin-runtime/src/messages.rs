//! Messages sent into the runtime from outside the pump.

use sequin_flow::{ComponentId, SEQOUT_OUTPUT};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::RuntimeError;
use crate::flow_state::FlowStateId;
use crate::logs::LogItemType;
use crate::state::SingleStepMode;

/// A host or debugger request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  Pause,
  Resume,
  Run,
  SingleStep(Option<SingleStepMode>),
  ToggleDebugger,
  Stop,
  ExecuteWidgetAction {
    component: ComponentId,
    value: Option<Value>,
    indexes: Vec<usize>,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeMessage {
  PropagateValue {
    flow_state: FlowStateId,
    component: ComponentId,
    output: String,
    value: Value,
  },
  SetInputValue {
    flow_state: FlowStateId,
    component: ComponentId,
    input: String,
    value: Value,
  },
  ThrowError {
    flow_state: FlowStateId,
    component: ComponentId,
    message: String,
  },
  Log {
    flow_state: FlowStateId,
    component: ComponentId,
    item_type: LogItemType,
    message: String,
  },
  /// The component's asynchronous work is done.
  Complete {
    flow_state: FlowStateId,
    component: ComponentId,
  },
  Control(Command),
}

/// Lets asynchronous component work call back into the runtime.
///
/// Every call is queued and applied by the runner between pump passes.
/// Calls made after the runtime is gone are dropped.
#[derive(Debug, Clone)]
pub struct ComponentHandle {
  sender: mpsc::UnboundedSender<RuntimeMessage>,
  flow_state: FlowStateId,
  component: ComponentId,
}

impl ComponentHandle {
  pub(crate) fn new(
    sender: mpsc::UnboundedSender<RuntimeMessage>,
    flow_state: FlowStateId,
    component: ComponentId,
  ) -> Self {
    Self {
      sender,
      flow_state,
      component,
    }
  }

  fn send(&self, message: RuntimeMessage) {
    let _ = self.sender.send(message);
  }

  pub fn propagate_value(&self, output: impl Into<String>, value: Value) {
    self.send(RuntimeMessage::PropagateValue {
      flow_state: self.flow_state,
      component: self.component,
      output: output.into(),
      value,
    });
  }

  pub fn propagate_value_through_seqout(&self) {
    self.propagate_value(SEQOUT_OUTPUT, Value::Null);
  }

  /// Deliver a value to an input of this component.
  pub fn set_input_value(&self, input: impl Into<String>, value: Value) {
    self.send(RuntimeMessage::SetInputValue {
      flow_state: self.flow_state,
      component: self.component,
      input: input.into(),
      value,
    });
  }

  pub fn throw_error(&self, message: impl Into<String>) {
    self.send(RuntimeMessage::ThrowError {
      flow_state: self.flow_state,
      component: self.component,
      message: message.into(),
    });
  }

  pub fn log(&self, item_type: LogItemType, message: impl Into<String>) {
    self.send(RuntimeMessage::Log {
      flow_state: self.flow_state,
      component: self.component,
      item_type,
      message: message.into(),
    });
  }

  pub fn complete(&self) {
    self.send(RuntimeMessage::Complete {
      flow_state: self.flow_state,
      component: self.component,
    });
  }
}

/// Cloneable control handle for a running runtime.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
  sender: mpsc::UnboundedSender<RuntimeMessage>,
}

impl RuntimeHandle {
  pub(crate) fn new(sender: mpsc::UnboundedSender<RuntimeMessage>) -> Self {
    Self { sender }
  }

  pub fn send(&self, command: Command) -> Result<(), RuntimeError> {
    self
      .sender
      .send(RuntimeMessage::Control(command))
      .map_err(|_| RuntimeError::ChannelClosed)
  }

  pub fn pause(&self) -> Result<(), RuntimeError> {
    self.send(Command::Pause)
  }

  pub fn resume(&self) -> Result<(), RuntimeError> {
    self.send(Command::Resume)
  }

  pub fn single_step(&self, mode: Option<SingleStepMode>) -> Result<(), RuntimeError> {
    self.send(Command::SingleStep(mode))
  }

  pub fn toggle_debugger(&self) -> Result<(), RuntimeError> {
    self.send(Command::ToggleDebugger)
  }

  pub fn stop(&self) -> Result<(), RuntimeError> {
    self.send(Command::Stop)
  }

  pub fn execute_widget_action(
    &self,
    component: ComponentId,
    value: Option<Value>,
    indexes: Vec<usize>,
  ) -> Result<(), RuntimeError> {
    self.send(Command::ExecuteWidgetAction {
      component,
      value,
      indexes,
    })
  }
}
