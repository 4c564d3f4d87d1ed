//! Runtime error types.

use crate::expression::ExpressionError;

/// Errors returned by the runtime API.
///
/// Failures inside component bodies are not reported here; they are routed
/// to `@error` outputs or catch components, or stop the runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// No executor is registered for a component type used by the project.
  #[error("unknown component type '{component_type}' used by '{component}'")]
  UnknownComponentType {
    component_type: String,
    component: String,
  },

  /// A flow was looked up by name and not found.
  #[error("flow not found: {0}")]
  FlowNotFound(String),

  /// A component id does not belong to the project.
  #[error("component not found: {0}")]
  ComponentNotFound(String),

  /// No unfinished flow state runs the given flow.
  #[error("no live flow state for flow '{0}'")]
  NoLiveFlowState(String),

  /// A flow was expected to be an action.
  #[error("flow '{0}' is not an action")]
  NotAnAction(String),

  /// A widget operation was requested for a non-widget component.
  #[error("component '{0}' is not a widget")]
  NotAWidget(String),

  /// The runtime has been stopped.
  #[error("runtime is stopped")]
  Stopped,

  /// The runner channel was closed.
  #[error("runtime channel closed")]
  ChannelClosed,

  /// Reading or writing a debug-info or settings file failed.
  #[error("io error on '{path}': {message}")]
  Io { path: String, message: String },

  /// A debug-info or settings document could not be decoded.
  #[error("invalid document: {message}")]
  InvalidDocument { message: String },
}

/// Errors a component body can return.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
  /// Ordinary failure. Routed to `@error` or a catch component.
  #[error("{0}")]
  Failed(String),

  /// Evaluating or assigning an expression failed.
  #[error(transparent)]
  Expression(#[from] ExpressionError),

  /// A required input has no value.
  #[error("input '{0}' has no value")]
  MissingInput(String),

  /// A required property is missing or has the wrong type.
  #[error("invalid property '{name}': {message}")]
  InvalidProperty { name: String, message: String },
}

impl ComponentError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed(message.into())
  }

  /// Whether the error stops the runtime instead of being routed.
  ///
  /// Malformed or non-assignable expressions are authoring errors and are
  /// never handed to catch components.
  pub fn is_fatal(&self) -> bool {
    matches!(self, Self::Expression(e) if e.is_authoring_error())
  }
}
