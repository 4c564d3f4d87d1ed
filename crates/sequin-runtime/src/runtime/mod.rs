//! The runtime: owner of every flow state, the task queue and the debugger
//! state.
//!
//! All mutation goes through `&mut Runtime` on one logical thread. Work
//! started by components on other tasks reports back through
//! `RuntimeMessage`s applied by `process_messages` (or `FlowRunner`).

mod catch;
mod debug_info;
mod execution;
mod propagation;
mod scheduler;
mod startup;

use std::collections::BTreeSet;
use std::sync::Arc;

use sequin_flow::{Component, ComponentId, ConnectionLineId, FlowId, Project};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::breakpoints::{Breakpoints, NoBreakpoints};
use crate::config::RuntimeConfig;
use crate::data_context::{DataContext, InMemoryDataContext};
use crate::error::RuntimeError;
use crate::flow_state::{ComponentState, FlowState, FlowStateId};
use crate::logs::{LogItem, LogItemType, LogKind, LogSink, NoopLogSink, RuntimeLogs};
use crate::messages::{Command, RuntimeHandle, RuntimeMessage};
use crate::queue::{QueueTask, QueueTaskId, TaskQueue};
use crate::registry::ComponentRegistry;
use crate::settings::{PERSISTENT_VARIABLES_KEY, RuntimeSettings};
use crate::state::{RuntimeAction, RuntimeState, SingleStepMode, Transition, UiMode};

pub use debug_info::{
  ComponentStateInfo, DebugInfo, FlowStateInfo, QueueTaskInfo,
};

pub struct Runtime {
  project: Arc<Project>,
  registry: ComponentRegistry,
  config: RuntimeConfig,

  state: RuntimeState,
  error: Option<String>,
  is_debugger_active: bool,
  front_face: bool,
  ui_mode: UiMode,

  queue: TaskQueue,
  flow_states: Vec<FlowState>,
  root_flow_states: Vec<FlowStateId>,
  data_context: Box<dyn DataContext>,
  logs: RuntimeLogs,
  breakpoints: Box<dyn Breakpoints>,
  settings: RuntimeSettings,

  single_step_mode: SingleStepMode,
  single_step_queue_task: Option<QueueTask>,
  single_step_last_skipped_task: Option<QueueTaskId>,
  last_breakpoint_task: Option<QueueTaskId>,
  selected_flow_state: Option<FlowStateId>,
  selected_queue_task: Option<QueueTaskId>,
  active_connection_lines: BTreeSet<ConnectionLineId>,

  sender: mpsc::UnboundedSender<RuntimeMessage>,
  receiver: Option<mpsc::UnboundedReceiver<RuntimeMessage>>,
}

impl Runtime {
  /// Create a runtime for `project`.
  ///
  /// Fails if a component type has no executor in `registry`, or if the
  /// settings file cannot be read.
  pub fn new(
    project: Arc<Project>,
    registry: ComponentRegistry,
    config: RuntimeConfig,
  ) -> Result<Self, RuntimeError> {
    registry.validate(&project)?;

    let settings = match &config.settings_path {
      Some(path) => RuntimeSettings::load(path)?,
      None => RuntimeSettings::in_memory(),
    };
    let (sender, receiver) = mpsc::unbounded_channel();

    Ok(Self {
      project,
      registry,
      config,
      state: RuntimeState::Starting,
      error: None,
      is_debugger_active: false,
      front_face: false,
      ui_mode: UiMode::Runtime,
      queue: TaskQueue::new(),
      flow_states: Vec::new(),
      root_flow_states: Vec::new(),
      data_context: Box::new(InMemoryDataContext::new()),
      logs: RuntimeLogs::new(Arc::new(NoopLogSink)),
      breakpoints: Box::new(NoBreakpoints),
      settings,
      single_step_mode: SingleStepMode::default(),
      single_step_queue_task: None,
      single_step_last_skipped_task: None,
      last_breakpoint_task: None,
      selected_flow_state: None,
      selected_queue_task: None,
      active_connection_lines: BTreeSet::new(),
      sender,
      receiver: Some(receiver),
    })
  }

  pub fn with_data_context(mut self, data_context: Box<dyn DataContext>) -> Self {
    self.data_context = data_context;
    self
  }

  pub fn with_breakpoints(mut self, breakpoints: Box<dyn Breakpoints>) -> Self {
    self.breakpoints = breakpoints;
    self
  }

  pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
    self.logs.set_sink(sink);
    self
  }

  pub fn set_breakpoints(&mut self, breakpoints: Box<dyn Breakpoints>) {
    self.breakpoints = breakpoints;
  }

  // Accessors

  pub fn project(&self) -> &Arc<Project> {
    &self.project
  }

  pub fn config(&self) -> &RuntimeConfig {
    &self.config
  }

  pub fn state(&self) -> RuntimeState {
    self.state
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn is_debugger_active(&self) -> bool {
    self.is_debugger_active
  }

  pub fn front_face(&self) -> bool {
    self.front_face
  }

  pub fn ui_mode(&self) -> UiMode {
    self.ui_mode
  }

  pub fn is_paused(&self) -> bool {
    self.state == RuntimeState::Paused
  }

  pub fn is_stopped(&self) -> bool {
    self.state == RuntimeState::Stopped
  }

  pub fn queue(&self) -> &TaskQueue {
    &self.queue
  }

  pub fn flow_state(&self, id: FlowStateId) -> Option<&FlowState> {
    self.flow_states.get(id.0)
  }

  /// Every flow state ever created, finished ones included.
  pub fn flow_states(&self) -> &[FlowState] {
    &self.flow_states
  }

  pub fn root_flow_states(&self) -> &[FlowStateId] {
    &self.root_flow_states
  }

  pub fn component_state(
    &self,
    flow_state: FlowStateId,
    component: ComponentId,
  ) -> Option<&ComponentState> {
    self.flow_state(flow_state)?.component_state(component)
  }

  pub(crate) fn component_state_mut(
    &mut self,
    flow_state: FlowStateId,
    component: &Component,
  ) -> &mut ComponentState {
    self.flow_states[flow_state.0].component_state_mut(component)
  }

  pub fn logs(&self) -> &[LogItem] {
    self.logs.items()
  }

  pub fn data_context(&self) -> &dyn DataContext {
    self.data_context.as_ref()
  }

  pub fn single_step_mode(&self) -> SingleStepMode {
    self.single_step_mode
  }

  pub fn single_step_queue_task(&self) -> Option<QueueTask> {
    self.single_step_queue_task
  }

  pub fn selected_flow_state(&self) -> Option<FlowStateId> {
    self.selected_flow_state
  }

  pub fn selected_queue_task(&self) -> Option<QueueTaskId> {
    self.selected_queue_task
  }

  /// Select a flow state in the debugger.
  pub fn select_flow_state(&mut self, flow_state: Option<FlowStateId>) {
    self.selected_flow_state = flow_state;
  }

  pub fn is_connection_line_active(&self, line: ConnectionLineId) -> bool {
    self.active_connection_lines.contains(&line)
  }

  /// A variable visible from `flow_state`.
  pub fn variable(&self, flow_state: FlowStateId, name: &str) -> Option<Value> {
    let scope = self.flow_state(flow_state)?.scope;
    self.data_context.get(scope, name)
  }

  pub fn global_variable(&self, name: &str) -> Option<Value> {
    self
      .data_context
      .get(self.data_context.global_scope(), name)
  }

  /// A control handle for hosts and debuggers.
  pub fn handle(&self) -> RuntimeHandle {
    RuntimeHandle::new(self.sender.clone())
  }

  pub(crate) fn sender(&self) -> mpsc::UnboundedSender<RuntimeMessage> {
    self.sender.clone()
  }

  /// Take the message receiver. Used by `FlowRunner`; afterwards
  /// `process_messages` does nothing.
  pub fn take_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<RuntimeMessage>> {
    self.receiver.take()
  }

  // Lookups

  /// Flow state by its uid.
  pub fn find_flow_state_by_id(&self, uid: &str) -> Option<FlowStateId> {
    self
      .flow_states
      .iter()
      .find(|flow_state| flow_state.uid == uid)
      .map(|flow_state| flow_state.id)
  }

  /// First live flow state running `flow`, searched depth-first from the
  /// root flow states.
  pub fn flow_state_for_flow(&self, flow: FlowId) -> Option<FlowStateId> {
    let mut stack: Vec<FlowStateId> = self.root_flow_states.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
      let flow_state = &self.flow_states[id.0];
      if flow_state.flow == flow && !flow_state.is_finished {
        return Some(id);
      }
      stack.extend(flow_state.children.iter().rev().copied());
    }
    None
  }

  /// Child of `parent` spawned by `component`.
  pub fn flow_state_by_component(
    &self,
    parent: FlowStateId,
    component: ComponentId,
  ) -> Option<FlowStateId> {
    self
      .flow_state(parent)?
      .children
      .iter()
      .rev()
      .copied()
      .find(|child| self.flow_states[child.0].component == Some(component))
  }

  /// Parent flow state and calling component of an action call.
  pub fn caller_of(&self, flow_state: FlowStateId) -> Option<(FlowStateId, ComponentId)> {
    let flow_state = self.flow_state(flow_state)?;
    Some((flow_state.parent?, flow_state.component?))
  }

  /// Nothing queued and no component running or waiting on work.
  pub fn is_idle(&self) -> bool {
    self.queue.is_empty()
      && self
        .flow_states
        .iter()
        .filter(|flow_state| !flow_state.is_finished)
        .all(|flow_state| flow_state.component_states().all(|state| !state.is_busy()))
  }

  // Settings

  pub fn read_settings(&self, key: &str) -> Option<&Value> {
    self.settings.get(key)
  }

  pub fn write_settings(&mut self, key: impl Into<String>, value: Value) {
    self.settings.set(key, value);
  }

  // Lifecycle

  /// Start every page flow and enter `RUNNING`, or `PAUSED` with the
  /// debugger active.
  pub fn start_runtime(&mut self, debugger: bool) {
    if self.state != RuntimeState::Starting {
      warn!(state = ?self.state, "runtime already started");
      return;
    }

    self.data_context.clear();
    self.transition(if debugger {
      RuntimeAction::StartWithDebugger
    } else {
      RuntimeAction::StartWithoutDebugger
    });
    self.is_debugger_active = debugger;
    self.init_global_variables();

    let project = Arc::clone(&self.project);
    for flow in project.pages() {
      let id = self.create_flow_state(flow.id, None, None);
      self.root_flow_states.push(id);
    }
    for id in self.root_flow_states.clone() {
      self.start_flow(id);
    }

    info!(
      project = %project.name,
      debugger,
      pages = self.root_flow_states.len(),
      queued = self.queue.len(),
      "runtime started"
    );

    self.transition(if debugger {
      RuntimeAction::Pause
    } else {
      RuntimeAction::Run
    });
  }

  /// Stop the runtime, optionally with an error.
  ///
  /// Every flow state is finished bottom-up, disposing outstanding work,
  /// and persistent variables are saved.
  pub fn stop_runtime(&mut self, error: Option<String>) {
    if self.is_stopped() {
      return;
    }
    if let Some(error) = error {
      self.error = Some(error);
    }

    self.transition(RuntimeAction::Stop);

    for id in self.root_flow_states.clone() {
      self.finish_flow_state(id);
    }
    self.save_persistent_variables();

    match &self.error {
      Some(error) => error!(error = %error, "runtime stopped with error"),
      None => info!("runtime stopped"),
    }
  }

  pub(crate) fn stop_runtime_with_error(&mut self, error: String) {
    self.stop_runtime(Some(error));
  }

  /// Apply a state-machine action. Pairs outside the transition table are
  /// logged and ignored.
  pub fn transition(&mut self, action: RuntimeAction) {
    match self.state.transition(action) {
      Transition::Enter(next) => {
        match (self.state, action) {
          (RuntimeState::Starting, RuntimeAction::StartWithoutDebugger) => self.front_face = true,
          (RuntimeState::Starting, RuntimeAction::StartWithDebugger) => {
            self.front_face = false;
            self.ui_mode = UiMode::Debugger;
          }
          _ => {}
        }
        debug!(from = ?self.state, to = ?next, action = ?action, "runtime transition");
        self.set_state(next);
      }
      Transition::InspectStopped => {
        self.is_debugger_active = true;
        self.front_face = false;
        self.ui_mode = UiMode::Debugger;
      }
      Transition::Invalid => {
        error!(state = ?self.state, action = ?action, "invalid runtime transition");
      }
    }
  }

  fn set_state(&mut self, state: RuntimeState) {
    self.state = state;

    match state {
      RuntimeState::Paused => {
        if !self.is_debugger_active {
          self.is_debugger_active = true;
          self.ui_mode = UiMode::Debugger;
        }
        self.show_next_queue_task();
      }
      RuntimeState::Stopped => {
        if self.error.is_some() {
          self.is_debugger_active = true;
          self.front_face = false;
          self.ui_mode = UiMode::Debugger;
        } else {
          self.ui_mode = UiMode::Editor;
        }
      }
      _ => {}
    }
  }

  // Messages

  /// Apply every message queued by asynchronous work or control handles.
  /// Returns how many were applied.
  pub fn process_messages(&mut self) -> usize {
    let Some(mut receiver) = self.receiver.take() else {
      return 0;
    };

    let mut applied = 0;
    while let Ok(message) = receiver.try_recv() {
      self.apply_message(message);
      applied += 1;
    }
    self.receiver = Some(receiver);
    applied
  }

  /// Apply one message.
  pub fn apply_message(&mut self, message: RuntimeMessage) {
    if let RuntimeMessage::Control(command) = message {
      self.apply_command(command);
      return;
    }

    if self.is_stopped() {
      debug!(message = ?message, "message dropped, runtime is stopped");
      return;
    }

    match message {
      RuntimeMessage::PropagateValue {
        flow_state,
        component,
        output,
        value,
      } => {
        if self.is_known(flow_state, component) {
          self.propagate_value(flow_state, component, &output, value);
        }
      }
      RuntimeMessage::SetInputValue {
        flow_state,
        component,
        input,
        value,
      } => {
        if self.is_known(flow_state, component) {
          self.set_input_value(flow_state, component, &input, value, None);
        }
      }
      RuntimeMessage::ThrowError {
        flow_state,
        component,
        message,
      } => {
        if self.is_known(flow_state, component) {
          self.throw_error(flow_state, component, message);
        }
      }
      RuntimeMessage::Log {
        flow_state,
        component,
        item_type,
        message,
      } => {
        if self.is_known(flow_state, component) {
          self.log_user(flow_state, component, item_type, message);
        }
      }
      RuntimeMessage::Complete {
        flow_state,
        component,
      } => {
        if self.is_known(flow_state, component) {
          self.complete_operation(flow_state, component);
        }
      }
      RuntimeMessage::Control(_) => {}
    }
  }

  fn apply_command(&mut self, command: Command) {
    debug!(command = ?command, "runtime command");
    match command {
      Command::Pause => self.pause(),
      Command::Resume => self.resume(),
      Command::Run => self.transition(RuntimeAction::Run),
      Command::SingleStep(mode) => self.run_single_step(mode),
      Command::ToggleDebugger => self.toggle_debugger(),
      Command::Stop => self.stop_runtime(None),
      Command::ExecuteWidgetAction {
        component,
        value,
        indexes,
      } => {
        if let Err(e) = self.execute_widget_action(component, value, &indexes) {
          warn!(error = %e, "widget action rejected");
        }
      }
    }
  }

  fn is_known(&self, flow_state: FlowStateId, component: ComponentId) -> bool {
    let known = flow_state.0 < self.flow_states.len()
      && self
        .project
        .flows()
        .get(component.flow.0)
        .is_some_and(|flow| component.index < flow.components.len());
    if !known {
      warn!(flow_state = flow_state.0, component = ?component, "message for unknown component");
    }
    known
  }

  // Logging helpers

  pub(crate) fn add_log(&mut self, item: LogItem) {
    self.logs.add(item);
  }

  /// A log item tagged with a flow state and component.
  pub(crate) fn log_item(
    &self,
    item_type: LogItemType,
    kind: LogKind,
    message: impl Into<String>,
    flow_state: FlowStateId,
    component: Option<ComponentId>,
  ) -> LogItem {
    let mut item = LogItem::new(item_type, kind, message);
    if let Some(flow_state) = self.flow_state(flow_state) {
      item = item.with_flow_state(flow_state.uid.clone());
    }
    if let Some(component) = component {
      item = item.with_component(self.project.component_path(component));
    }
    item
  }

  pub(crate) fn log_user(
    &mut self,
    flow_state: FlowStateId,
    component: ComponentId,
    item_type: LogItemType,
    message: String,
  ) {
    let item = self.log_item(item_type, LogKind::User, message, flow_state, Some(component));
    self.add_log(item);
  }

  // Variables

  fn init_global_variables(&mut self) {
    let persisted = self
      .settings
      .get(PERSISTENT_VARIABLES_KEY)
      .and_then(Value::as_object)
      .cloned()
      .unwrap_or_default();

    let global = self.data_context.global_scope();
    let project = Arc::clone(&self.project);
    for variable in &project.global_variables {
      let value = variable
        .persistent
        .then(|| persisted.get(&variable.name).cloned())
        .flatten()
        .unwrap_or_else(|| variable.default_value.clone());
      self.data_context.set(global, &variable.name, value);
    }
  }

  fn save_persistent_variables(&mut self) {
    let global = self.data_context.global_scope();
    let values: Map<String, Value> = self
      .project
      .global_variables
      .iter()
      .filter(|variable| variable.persistent)
      .filter_map(|variable| {
        self
          .data_context
          .get(global, &variable.name)
          .map(|value| (variable.name.clone(), value))
      })
      .collect();

    if values.is_empty() {
      return;
    }

    self
      .settings
      .set(PERSISTENT_VARIABLES_KEY, Value::Object(values));
    if let Err(e) = self.settings.save() {
      error!(error = %e, "failed to save runtime settings");
    }
  }
}

impl std::fmt::Debug for Runtime {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Runtime")
      .field("project", &self.project.name)
      .field("state", &self.state)
      .field("error", &self.error)
      .field("is_debugger_active", &self.is_debugger_active)
      .field("queue", &self.queue.len())
      .field("flow_states", &self.flow_states.len())
      .finish()
  }
}
