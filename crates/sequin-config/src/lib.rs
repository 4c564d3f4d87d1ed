//! Sequin Config
//!
//! This crate contains the serializable project definition types for sequin.
//! These types describe flows, components and connection lines before they are
//! validated and indexed by `sequin-flow`.
//!
//! Definitions are loaded from JSON files (via the CLI `run` command) or built
//! in memory by embedders and tests.
//!
//! # Example
//!
//! ```json
//! {
//!   "name": "demo",
//!   "flows": [
//!     {
//!       "name": "main",
//!       "kind": "action",
//!       "components": [
//!         { "name": "start", "type": "Start" },
//!         { "name": "log", "type": "Log", "inputs": [{ "name": "value" }] }
//!       ],
//!       "connection_lines": [
//!         { "source": "start", "output": "@seqout", "target": "log", "input": "@seqin" }
//!       ]
//!     }
//!   ]
//! }
//! ```

mod component;
mod flow;
mod project;

pub use component::{ComponentDef, InputDef, OutputDef};
pub use flow::{ConnectionLineDef, FlowDef, FlowKind};
pub use project::{ProjectDef, VariableDef};
