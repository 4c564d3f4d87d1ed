//! Flow runtime for sequin.
//!
//! This crate executes a loaded `sequin_flow::Project`: components run when
//! their inputs are satisfied, values travel along connection lines, errors
//! are routed to `@error` outputs or catch components, and a debugger can
//! pause, single-step and snapshot the whole state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        FlowRunner                           │
//! │  - owns the runtime and its message receiver                │
//! │  - pumps on a tick, applies messages between passes         │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Runtime                             │
//! │  - state machine (STARTING → RUNNING ⇄ PAUSED → STOPPED)    │
//! │  - task queue + pump, readiness, propagation                │
//! │  - flow state arena, error routing, debug-info              │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ComponentExecutor (trait)                  │
//! │  - execute(ctx) → Completed | SelfPropagated | Pending ...  │
//! │  - async work reports back through a ComponentHandle        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use sequin_runtime::{ComponentRegistry, FlowRunner, Runtime, RuntimeConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let project = Arc::new(Project::from_json(&json)?);
//! let runtime = Runtime::new(project, ComponentRegistry::builtin(), RuntimeConfig::default())?;
//!
//! let runner = FlowRunner::new(runtime)?;
//! let handle = runner.handle();
//! let runtime = runner.run(CancellationToken::new()).await;
//! ```

mod breakpoints;
pub mod components;
mod config;
mod context;
mod data_context;
mod error;
pub mod expression;
mod flow_state;
mod logs;
mod messages;
mod operation;
mod queue;
mod registry;
mod runner;
mod runtime;
mod settings;
mod state;

pub use breakpoints::{BreakpointSet, Breakpoints, NoBreakpoints};
pub use config::RuntimeConfig;
pub use context::{ComponentExecutor, Execution, ExecutionContext};
pub use data_context::{DataContext, InMemoryDataContext, ScopeId};
pub use error::{ComponentError, RuntimeError};
pub use expression::ExpressionError;
pub use flow_state::{ComponentState, FlowState, FlowStateId};
pub use logs::{ChannelLogSink, LogItem, LogItemType, LogKind, LogSink, NoopLogSink, RuntimeLogs};
pub use messages::{Command, ComponentHandle, RuntimeHandle, RuntimeMessage};
pub use operation::{AsyncOperation, SpawnedOperation};
pub use queue::{QueueTask, QueueTaskId, TaskQueue};
pub use registry::ComponentRegistry;
pub use runner::FlowRunner;
pub use runtime::{ComponentStateInfo, DebugInfo, FlowStateInfo, QueueTaskInfo, Runtime};
pub use settings::{PERSISTENT_VARIABLES_KEY, RuntimeSettings};
pub use state::{RuntimeAction, RuntimeState, SingleStepMode, Transition, UiMode};
