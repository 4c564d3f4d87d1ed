use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("failed to parse project: {message}")]
  Parse { message: String },

  #[error("duplicate flow name: {0}")]
  DuplicateFlow(String),

  #[error("duplicate component '{component}' in flow '{flow}'")]
  DuplicateComponent { flow: String, component: String },

  #[error("connection line in flow '{flow}' references unknown component '{component}'")]
  UnknownComponent { flow: String, component: String },

  #[error("component '{component}' in flow '{flow}' has no output '{output}'")]
  UnknownOutput {
    flow: String,
    component: String,
    output: String,
  },

  #[error("component '{component}' in flow '{flow}' has no input '{input}'")]
  UnknownInput {
    flow: String,
    component: String,
    input: String,
  },

  #[error("connection line in flow '{flow}' from '{source_component}' has a target without an input")]
  MissingTargetInput { flow: String, source_component: String },
}
