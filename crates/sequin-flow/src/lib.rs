//! Sequin Flow
//!
//! This crate provides the loaded, immutable program the runtime executes.
//! A `Project` is built from a `sequin_config::ProjectDef` once and never
//! changes while flows run.
//!
//! Key differences from `sequin-config`:
//! - Names are resolved to typed ids (`FlowId`, `ComponentId`, `ConnectionLineId`)
//! - Every component carries a `ComponentKind` decided at load time
//! - Implicit `@seqin`, `@seqout` and `@error` pins are added
//! - Connection lines are validated against declared pins and indexed per flow
//! - Every flow, component and line has a stable string path

mod component;
mod error;
mod flow;
mod graph;
mod path;
mod project;

pub use component::{
  Component, ComponentId, ComponentInput, ComponentKind, ComponentOutput, ERROR_OUTPUT,
  SEQIN_INPUT, SEQOUT_OUTPUT,
};
pub use error::FlowError;
pub use flow::{ConnectionLine, ConnectionLineId, Flow, FlowId, LineTarget, Variable};
pub use graph::Graph;
pub use project::Project;
pub use sequin_config::FlowKind;
