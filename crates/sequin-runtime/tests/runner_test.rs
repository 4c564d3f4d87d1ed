//! Integration tests for the async flow runner.

use std::sync::Arc;
use std::time::Duration;

use sequin_flow::Project;
use sequin_runtime::{
  ComponentRegistry, FlowRunner, LogKind, Runtime, RuntimeConfig, RuntimeState,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

fn load(value: Value) -> Arc<Project> {
  Arc::new(Project::from_json(&value.to_string()).unwrap())
}

fn config(stop_when_idle: bool) -> RuntimeConfig {
  RuntimeConfig {
    tick: Duration::from_millis(1),
    stop_when_idle,
    ..RuntimeConfig::default()
  }
}

fn user_messages(runtime: &Runtime) -> Vec<String> {
  runtime
    .logs()
    .iter()
    .filter(|item| item.kind == LogKind::User)
    .map(|item| item.message.clone())
    .collect()
}

fn delay_project() -> Value {
  json!({
    "name": "delay",
    "flows": [{
      "name": "main",
      "kind": "page",
      "components": [
        { "name": "start", "type": "Start" },
        { "name": "wait", "type": "Delay", "properties": { "milliseconds": "20" } },
        { "name": "log", "type": "Log", "properties": { "value": "\"done\"" } }
      ],
      "connection_lines": [
        { "source": "start", "output": "@seqout", "target": "wait", "input": "@seqin" },
        { "source": "wait", "output": "@seqout", "target": "log", "input": "@seqin" }
      ]
    }]
  })
}

#[tokio::test]
async fn test_runner_waits_for_delay_then_stops_when_idle() {
  let runtime = Runtime::new(
    load(delay_project()),
    ComponentRegistry::builtin(),
    config(true),
  )
  .unwrap();
  let runner = FlowRunner::new(runtime).unwrap();

  let runtime = tokio::time::timeout(Duration::from_secs(5), runner.run(CancellationToken::new()))
    .await
    .expect("runner did not stop");

  assert_eq!(runtime.state(), RuntimeState::Stopped);
  assert!(runtime.error().is_none());
  assert_eq!(user_messages(&runtime), vec!["done"]);
}

#[tokio::test]
async fn test_stop_command_ends_the_runner() {
  let runtime = Runtime::new(
    load(delay_project()),
    ComponentRegistry::builtin(),
    config(false),
  )
  .unwrap();
  let runner = FlowRunner::new(runtime).unwrap();
  let handle = runner.handle();

  let task = tokio::spawn(runner.run(CancellationToken::new()));
  tokio::time::sleep(Duration::from_millis(5)).await;
  handle.stop().unwrap();

  let runtime = tokio::time::timeout(Duration::from_secs(5), task)
    .await
    .expect("runner did not stop")
    .unwrap();
  assert!(runtime.is_stopped());
  assert!(runtime.error().is_none());
}

#[tokio::test]
async fn test_cancellation_stops_the_runtime() {
  let runtime = Runtime::new(
    load(delay_project()),
    ComponentRegistry::builtin(),
    config(false),
  )
  .unwrap();
  let runner = FlowRunner::new(runtime).unwrap();

  let cancel = CancellationToken::new();
  cancel.cancel();

  let runtime = tokio::time::timeout(Duration::from_secs(5), runner.run(cancel))
    .await
    .expect("runner did not stop");
  assert!(runtime.is_stopped());
  let page = runtime.root_flow_states()[0];
  assert!(runtime.flow_state(page).unwrap().is_finished);
}

#[test]
fn test_receiver_can_only_be_taken_once() {
  let mut runtime = Runtime::new(
    load(delay_project()),
    ComponentRegistry::builtin(),
    config(false),
  )
  .unwrap();

  assert!(runtime.take_receiver().is_some());
  assert!(FlowRunner::new(runtime).is_err());
}

#[tokio::test]
async fn test_out_of_range_delay_is_a_component_error() {
  let project = load(json!({
    "name": "huge-delay",
    "flows": [{
      "name": "main",
      "kind": "page",
      "components": [
        { "name": "start", "type": "Start" },
        { "name": "wait", "type": "Delay", "properties": { "milliseconds": 1e23 } }
      ],
      "connection_lines": [
        { "source": "start", "output": "@seqout", "target": "wait", "input": "@seqin" }
      ]
    }]
  }));
  let mut runtime = Runtime::new(project, ComponentRegistry::builtin(), config(false)).unwrap();

  runtime.start_runtime(false);
  runtime.run_until_idle(10);

  assert!(runtime.is_stopped());
  let error = runtime.error().unwrap();
  assert!(error.contains("invalid property 'milliseconds'"), "{error}");
}
