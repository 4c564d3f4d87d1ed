//! Integration tests for pausing, stepping, breakpoints and debug-info.

use std::sync::Arc;

use sequin_flow::{ComponentId, Project};
use sequin_runtime::{
  AsyncOperation, BreakpointSet, ComponentError, ComponentExecutor, ComponentRegistry, DebugInfo,
  Execution, ExecutionContext, LogKind, Runtime, RuntimeConfig, RuntimeState, SingleStepMode,
  UiMode,
};
use serde_json::{Value, json};

fn load(value: Value) -> Arc<Project> {
  Arc::new(Project::from_json(&value.to_string()).unwrap())
}

fn runtime(project: &Arc<Project>) -> Runtime {
  Runtime::new(
    Arc::clone(project),
    ComponentRegistry::builtin(),
    RuntimeConfig::default(),
  )
  .unwrap()
}

fn component_id(project: &Project, flow: &str, name: &str) -> ComponentId {
  project
    .flow_by_name(flow)
    .unwrap()
    .component_by_name(name)
    .unwrap()
    .id
}

fn user_messages(runtime: &Runtime) -> Vec<String> {
  runtime
    .logs()
    .iter()
    .filter(|item| item.kind == LogKind::User)
    .map(|item| item.message.clone())
    .collect()
}

fn queued(runtime: &Runtime) -> Vec<ComponentId> {
  runtime.queue().iter().map(|task| task.component).collect()
}

/// One page: start -> a -> b, where a and b log "1" and "2".
fn chain_project() -> Value {
  json!({
    "name": "chain",
    "global_variables": [{ "name": "total", "default_value": 3 }],
    "flows": [{
      "name": "main",
      "kind": "page",
      "local_variables": [{ "name": "step", "default_value": "a" }],
      "components": [
        { "name": "start", "type": "Start" },
        { "name": "a", "type": "Log", "properties": { "value": "1" } },
        { "name": "b", "type": "Log", "properties": { "value": "2" } }
      ],
      "connection_lines": [
        { "source": "start", "output": "@seqout", "target": "a", "input": "@seqin" },
        { "source": "a", "output": "@seqout", "target": "b", "input": "@seqin" }
      ]
    }]
  })
}

#[test]
fn test_start_with_debugger_pauses() {
  let project = load(chain_project());
  let mut runtime = runtime(&project);

  runtime.start_runtime(true);

  assert_eq!(runtime.state(), RuntimeState::Paused);
  assert!(runtime.is_debugger_active());
  assert!(!runtime.front_face());
  assert_eq!(runtime.ui_mode(), UiMode::Debugger);

  runtime.pump();
  runtime.pump();
  assert_eq!(runtime.queue().len(), 1);
  assert!(user_messages(&runtime).is_empty());
}

#[test]
fn test_single_step_runs_one_task() {
  let project = load(chain_project());
  let a = component_id(&project, "main", "a");
  let b = component_id(&project, "main", "b");
  let mut runtime = runtime(&project);
  runtime.start_runtime(true);

  runtime.run_single_step(Some(SingleStepMode::StepOver));
  assert_eq!(runtime.state(), RuntimeState::SingleStep);
  runtime.pump();

  assert_eq!(runtime.state(), RuntimeState::Paused);
  assert_eq!(queued(&runtime), vec![a]);
  let head = runtime.queue().front().unwrap().id;
  assert_eq!(runtime.selected_queue_task(), Some(head));

  runtime.run_single_step(Some(SingleStepMode::StepOver));
  runtime.pump();

  assert_eq!(runtime.state(), RuntimeState::Paused);
  assert_eq!(user_messages(&runtime), vec!["1"]);
  assert_eq!(queued(&runtime), vec![b]);
}

#[test]
fn test_step_over_skips_unrelated_flow_states() {
  let project = load(json!({
    "name": "two-pages",
    "flows": [
      {
        "name": "first",
        "kind": "page",
        "components": [
          { "name": "start", "type": "Start" },
          { "name": "log", "type": "Log", "properties": { "value": "\"first\"" } }
        ],
        "connection_lines": [
          { "source": "start", "output": "@seqout", "target": "log", "input": "@seqin" }
        ]
      },
      {
        "name": "second",
        "kind": "page",
        "components": [{ "name": "start", "type": "Start" }]
      }
    ]
  }));
  let first_log = component_id(&project, "first", "log");
  let second_start = component_id(&project, "second", "start");
  let mut runtime = runtime(&project);
  runtime.start_runtime(true);

  runtime.run_single_step(Some(SingleStepMode::StepOver));
  runtime.pump();

  // the head belongs to another page, so stepping continues by itself
  assert_eq!(runtime.state(), RuntimeState::SingleStep);
  assert_eq!(queued(&runtime), vec![second_start, first_log]);

  runtime.pump();

  assert_eq!(runtime.state(), RuntimeState::Paused);
  assert_eq!(queued(&runtime), vec![first_log]);
  assert_eq!(
    runtime.single_step_queue_task().map(|task| task.component),
    Some(first_log)
  );
  assert!(user_messages(&runtime).is_empty());
}

#[test]
fn test_breakpoint_pauses_before_component() {
  let project = load(json!({
    "name": "breakpoint",
    "flows": [{
      "name": "main",
      "kind": "page",
      "components": [
        { "name": "start", "type": "Start" },
        { "name": "log", "type": "Log", "properties": { "value": "\"hit\"" } }
      ],
      "connection_lines": [
        { "source": "start", "output": "@seqout", "target": "log", "input": "@seqin" }
      ]
    }]
  }));
  let log = component_id(&project, "main", "log");
  let mut breakpoints = BreakpointSet::new();
  breakpoints.add(log);
  let mut runtime = runtime(&project).with_breakpoints(Box::new(breakpoints));

  runtime.start_runtime(true);
  runtime.resume();
  assert_eq!(runtime.state(), RuntimeState::Resumed);

  runtime.pump();
  runtime.pump();

  assert_eq!(runtime.state(), RuntimeState::Paused);
  assert_eq!(queued(&runtime), vec![log]);
  assert!(user_messages(&runtime).is_empty());
  let head = runtime.queue().front().unwrap().id;
  assert_eq!(runtime.selected_queue_task(), Some(head));

  runtime.resume();
  runtime.pump();

  assert_eq!(user_messages(&runtime), vec!["hit"]);
  assert!(runtime.queue().is_empty());
}

#[test]
fn test_toggle_debugger_through_handle() {
  let project = load(chain_project());
  let mut runtime = runtime(&project);
  let handle = runtime.handle();

  runtime.start_runtime(true);

  handle.toggle_debugger().unwrap();
  assert_eq!(runtime.process_messages(), 1);
  assert_eq!(runtime.state(), RuntimeState::Running);
  assert!(!runtime.is_debugger_active());
  assert_eq!(runtime.ui_mode(), UiMode::Runtime);

  runtime.run_until_idle(10);
  assert_eq!(user_messages(&runtime), vec!["1", "2"]);

  handle.pause().unwrap();
  runtime.process_messages();
  assert_eq!(runtime.state(), RuntimeState::Paused);
  assert!(runtime.is_debugger_active());

  handle.stop().unwrap();
  runtime.process_messages();
  assert!(runtime.is_stopped());
}

#[test]
fn test_debug_info_round_trip() {
  let project = load(chain_project());
  let mut original = runtime(&project);
  original.start_runtime(true);
  original.run_single_step(Some(SingleStepMode::StepOver));
  original.pump();

  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("debug-info.json");
  original.save_debug_info(&path).unwrap();

  let mut restored = runtime(&project);
  restored.load_debug_info(&path).unwrap();

  assert_eq!(restored.state(), RuntimeState::Paused);
  assert!(restored.is_debugger_active());
  assert_eq!(restored.debug_info(), original.debug_info());

  let info = DebugInfo::read(&path).unwrap();
  assert_eq!(info.global_variables.get("total"), Some(&json!(3)));
  assert_eq!(info.flow_states.len(), 1);
  assert_eq!(
    info.flow_states[0].local_variables.get("step"),
    Some(&json!("a"))
  );
  assert_eq!(info.queue.len(), 1);
  assert_eq!(info.queue[0].component, "main/components/a");

  restored.resume();
  restored.run_until_idle(10);
  assert_eq!(user_messages(&restored), vec!["1", "2"]);
}

#[test]
fn test_restore_skips_unresolved_paths() {
  let project = load(chain_project());
  let mut original = runtime(&project);
  original.start_runtime(true);

  let mut info = original.debug_info();
  info.flow_states[0].flow = "gone".to_string();
  info.queue[0].component = "main/components/gone".to_string();

  let mut restored = runtime(&project);
  restored.restore_debug_info(info);

  assert!(restored.root_flow_states().is_empty());
  assert!(restored.queue().is_empty());
  assert_eq!(restored.state(), RuntimeState::Paused);
}

struct Pending;

impl AsyncOperation for Pending {
  fn dispose(self: Box<Self>) {}
}

/// Starts work that never reports completion.
struct Hold;

impl ComponentExecutor for Hold {
  fn execute(&self, _ctx: &mut ExecutionContext<'_>) -> Result<Execution, ComponentError> {
    Ok(Execution::Deferred(Box::new(Pending)))
  }
}

/// A page calling action `sub`: start -> call -> after. The action runs
/// start -> inner -> end, and with `hold` also starts a Hold after inner
/// that keeps the action alive.
fn nested_project(hold: bool) -> Value {
  let mut components = vec![
    json!({ "name": "start", "type": "Start" }),
    json!({ "name": "inner", "type": "Log", "properties": { "value": "\"inner\"" } }),
  ];
  let mut lines = vec![
    json!({ "source": "start", "output": "@seqout", "target": "inner", "input": "@seqin" }),
  ];
  if hold {
    components.push(json!({ "name": "hold", "type": "Hold" }));
    lines.push(json!({ "source": "inner", "output": "@seqout", "target": "hold", "input": "@seqin" }));
  }
  components.push(json!({ "name": "end", "type": "End" }));
  lines.push(json!({ "source": "inner", "output": "@seqout", "target": "end", "input": "@seqin" }));

  json!({
    "name": "nested",
    "flows": [
      {
        "name": "main",
        "kind": "page",
        "components": [
          { "name": "start", "type": "Start" },
          { "name": "call", "type": "CallAction", "properties": { "action": "sub" } },
          { "name": "after", "type": "Log", "properties": { "value": "\"after\"" } }
        ],
        "connection_lines": [
          { "source": "start", "output": "@seqout", "target": "call", "input": "@seqin" },
          { "source": "call", "output": "@seqout", "target": "after", "input": "@seqin" }
        ]
      },
      {
        "name": "sub",
        "kind": "action",
        "components": components,
        "connection_lines": lines
      }
    ]
  })
}

fn nested_runtime(project: &Arc<Project>) -> Runtime {
  let mut registry = ComponentRegistry::builtin();
  registry.register("Hold", Hold);
  Runtime::new(Arc::clone(project), registry, RuntimeConfig::default()).unwrap()
}

/// Single-step with `mode`, pumping until the runtime pauses again.
fn step(runtime: &mut Runtime, mode: SingleStepMode) -> usize {
  runtime.run_single_step(Some(mode));
  let mut pumps = 0;
  while runtime.state() == RuntimeState::SingleStep && pumps < 20 {
    runtime.pump();
    pumps += 1;
  }
  assert_eq!(runtime.state(), RuntimeState::Paused);
  pumps
}

/// Start paused and step until the call component is next.
fn paused_at_call(project: &Arc<Project>) -> Runtime {
  let mut runtime = nested_runtime(project);
  runtime.start_runtime(true);
  step(&mut runtime, SingleStepMode::StepOver);
  assert_eq!(
    queued(&runtime),
    vec![component_id(project, "main", "call")]
  );
  runtime
}

#[test]
fn test_step_over_runs_called_action_without_stopping() {
  let project = load(nested_project(true));
  let after = component_id(&project, "main", "after");
  let mut runtime = paused_at_call(&project);

  let pumps = step(&mut runtime, SingleStepMode::StepOver);

  // call, then every task of the child flow state, one per pass
  assert_eq!(pumps, 5);
  assert_eq!(user_messages(&runtime), vec!["inner"]);
  assert_eq!(queued(&runtime), vec![after]);
  assert_eq!(
    runtime.single_step_queue_task().map(|task| task.component),
    Some(after)
  );

  let page = runtime.root_flow_states()[0];
  let child = runtime.flow_state(page).unwrap().children[0];
  assert!(!runtime.flow_state(child).unwrap().is_finished);
  assert_eq!(runtime.selected_flow_state(), Some(page));
}

#[test]
fn test_step_into_stops_in_called_action() {
  let project = load(nested_project(true));
  let sub_start = component_id(&project, "sub", "start");
  let mut runtime = paused_at_call(&project);

  let pumps = step(&mut runtime, SingleStepMode::StepInto);

  assert_eq!(pumps, 1);
  assert_eq!(queued(&runtime), vec![sub_start]);
  assert!(user_messages(&runtime).is_empty());

  let page = runtime.root_flow_states()[0];
  let child = runtime.flow_state(page).unwrap().children[0];
  assert_eq!(runtime.selected_flow_state(), Some(child));
  assert_eq!(
    runtime.single_step_queue_task().map(|task| task.flow_state),
    Some(child)
  );
}

#[test]
fn test_step_over_stops_in_parent_flow_state() {
  let project = load(nested_project(true));
  let sub_end = component_id(&project, "sub", "end");
  let after = component_id(&project, "main", "after");
  let mut runtime = paused_at_call(&project);
  step(&mut runtime, SingleStepMode::StepInto);

  // start, inner, hold
  for _ in 0..3 {
    assert_eq!(step(&mut runtime, SingleStepMode::StepOver), 1);
  }
  assert_eq!(queued(&runtime), vec![sub_end]);

  assert_eq!(step(&mut runtime, SingleStepMode::StepOver), 1);

  let page = runtime.root_flow_states()[0];
  let child = runtime.flow_state(page).unwrap().children[0];
  assert!(!runtime.flow_state(child).unwrap().is_finished);
  assert_eq!(queued(&runtime), vec![after]);
  assert_eq!(
    runtime.single_step_queue_task().map(|task| task.component),
    Some(after)
  );
  assert_eq!(runtime.selected_flow_state(), Some(page));
}

#[test]
fn test_step_out_runs_until_action_finishes() {
  let project = load(nested_project(false));
  let after = component_id(&project, "main", "after");
  let mut runtime = paused_at_call(&project);
  step(&mut runtime, SingleStepMode::StepInto);

  let pumps = step(&mut runtime, SingleStepMode::StepOut);

  assert_eq!(pumps, 3);
  assert_eq!(user_messages(&runtime), vec!["inner"]);
  assert_eq!(queued(&runtime), vec![after]);

  // the anchor's flow state finished, so stepping no longer tracks it
  let page = runtime.root_flow_states()[0];
  let child = runtime.flow_state(page).unwrap().children[0];
  assert!(runtime.flow_state(child).unwrap().is_finished);
  assert!(runtime.single_step_queue_task().is_none());
  let head = runtime.queue().front().unwrap().id;
  assert_eq!(runtime.selected_queue_task(), Some(head));
}

#[test]
fn test_step_out_skips_while_action_is_alive() {
  let project = load(nested_project(true));
  let mut runtime = paused_at_call(&project);
  step(&mut runtime, SingleStepMode::StepInto);

  let pumps = step(&mut runtime, SingleStepMode::StepOut);

  assert_eq!(pumps, 5);
  assert_eq!(user_messages(&runtime), vec!["inner", "after"]);
  assert!(runtime.queue().is_empty());
}

#[test]
fn test_single_step_outside_pause_keeps_step_state() {
  let project = load(chain_project());
  let mut runtime = runtime(&project);
  runtime.start_runtime(false);

  runtime.run_single_step(Some(SingleStepMode::StepOut));

  assert_eq!(runtime.state(), RuntimeState::Running);
  assert_eq!(runtime.single_step_mode(), SingleStepMode::default());
  assert!(runtime.single_step_queue_task().is_none());
}

#[test]
fn test_restore_skips_task_with_unresolved_connection_line() {
  let project = load(chain_project());
  let a = component_id(&project, "main", "a");
  let mut original = runtime(&project);
  original.start_runtime(true);
  step(&mut original, SingleStepMode::StepOver);
  assert_eq!(queued(&original), vec![a]);

  let mut info = original.debug_info();
  assert!(info.queue[0].connection_line.is_some());
  info.queue[0].connection_line = Some("main/connection_lines/99".to_string());

  let mut restored = runtime(&project);
  restored.restore_debug_info(info);

  assert_eq!(restored.root_flow_states().len(), 1);
  assert!(restored.queue().is_empty());
}

#[test]
fn test_restore_skips_child_with_unresolved_component() {
  let project = load(nested_project(true));
  let mut original = paused_at_call(&project);
  step(&mut original, SingleStepMode::StepInto);

  let mut info = original.debug_info();
  assert_eq!(info.flow_states[0].flow_states.len(), 1);
  info.flow_states[0].flow_states[0].component = Some("main/components/gone".to_string());

  let mut restored = nested_runtime(&project);
  restored.restore_debug_info(info);

  let page = restored.root_flow_states()[0];
  assert!(restored.flow_state(page).unwrap().children.is_empty());
  assert_eq!(restored.flow_states().len(), 1);
  // the child's queued start had nowhere to go
  assert!(restored.queue().is_empty());
}

#[test]
fn test_restore_ignores_undeclared_local_variables() {
  let project = load(chain_project());
  let mut original = runtime(&project);
  original.start_runtime(true);

  let mut info = original.debug_info();
  info.flow_states[0]
    .local_variables
    .insert("stale".to_string(), json!(1));
  info.flow_states[0]
    .local_variables
    .insert("step".to_string(), json!("b"));

  let mut restored = runtime(&project);
  restored.restore_debug_info(info);

  let page = restored.root_flow_states()[0];
  assert_eq!(restored.variable(page, "step"), Some(json!("b")));
  assert_eq!(restored.variable(page, "stale"), None);
  assert_eq!(restored.global_variable("stale"), None);
}
