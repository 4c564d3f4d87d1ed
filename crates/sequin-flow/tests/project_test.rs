//! Loading and validation tests for `Project`.

use sequin_flow::{
  ComponentKind, ERROR_OUTPUT, FlowError, FlowKind, Project, SEQIN_INPUT, SEQOUT_OUTPUT,
};
use serde_json::json;

fn sample_project() -> serde_json::Value {
  json!({
    "name": "sample",
    "global_variables": [{ "name": "total", "default_value": 0 }],
    "flows": [
      {
        "name": "main",
        "kind": "page",
        "components": [
          { "name": "button", "type": "Button", "widget": true, "action": "work" },
          { "name": "catch", "type": "CatchError", "inputs": [{ "name": "message" }] }
        ]
      },
      {
        "name": "work",
        "kind": "action",
        "local_variables": [{ "name": "tmp", "default_value": "x" }],
        "components": [
          { "name": "start", "type": "Start" },
          { "name": "in", "type": "Input" },
          {
            "name": "add",
            "type": "Add",
            "inputs": [{ "name": "a", "value": 5 }, { "name": "b", "value": 7 }],
            "outputs": [{ "name": "result" }]
          },
          { "name": "log1", "type": "Log", "inputs": [{ "name": "value" }] },
          { "name": "log2", "type": "Log", "inputs": [{ "name": "value" }] }
        ],
        "connection_lines": [
          { "source": "start", "output": "@seqout", "target": "add", "input": "@seqin" },
          { "source": "add", "output": "result", "target": "log1", "input": "value" },
          { "source": "add", "output": "result", "target": "log2", "input": "value" },
          { "source": "add", "output": "@error" }
        ]
      }
    ]
  })
}

fn load(value: serde_json::Value) -> Result<Project, FlowError> {
  Project::from_json(&value.to_string())
}

#[test]
fn test_load_resolves_kinds_and_implicit_pins() {
  let project = load(sample_project()).unwrap();

  let main = project.flow_by_name("main").unwrap();
  assert_eq!(main.kind, FlowKind::Page);
  let button = main.component_by_name("button").unwrap();
  assert_eq!(button.kind, ComponentKind::Widget);
  assert!(button.input(SEQIN_INPUT).is_none());
  assert_eq!(button.action.as_deref(), Some("work"));

  let work = project.action("work").unwrap();
  assert_eq!(work.start_component().unwrap().name, "start");
  assert!(work.local_variable("tmp").is_some());

  let add = work.component_by_name("add").unwrap();
  assert_eq!(add.kind, ComponentKind::Generic);
  assert!(add.input(SEQIN_INPUT).unwrap().is_sequence_input);
  assert!(add.has_output(SEQOUT_OUTPUT));
  assert!(add.has_output(ERROR_OUTPUT));
  assert_eq!(add.mandatory_inputs().count(), 2);
  assert!(work.has_connected_sequence_input(add));

  let start = work.component_by_name("start").unwrap();
  assert!(start.input(SEQIN_INPUT).is_none());

  assert!(project.action("main").is_none());
  assert_eq!(project.pages().count(), 1);
}

#[test]
fn test_fan_out_lines_in_declaration_order() {
  let project = load(sample_project()).unwrap();
  let work = project.action("work").unwrap();
  let add = work.component_by_name("add").unwrap();

  let targets: Vec<String> = work
    .lines_from(add.id, "result")
    .map(|line| project.component(line.target.as_ref().unwrap().component).name.clone())
    .collect();
  assert_eq!(targets, vec!["log1", "log2"]);

  let dangling: Vec<_> = work.lines_from(add.id, ERROR_OUTPUT).collect();
  assert_eq!(dangling.len(), 1);
  assert!(dangling[0].target.is_none());
}

#[test]
fn test_paths_round_trip() {
  let project = load(sample_project()).unwrap();
  let work = project.action("work").unwrap();
  let add = work.component_by_name("add").unwrap();

  let path = project.component_path(add.id);
  assert_eq!(path, "work/components/add");
  assert_eq!(project.resolve_component_path(&path), Some(add.id));

  let line = &work.connection_lines[1];
  let line_path = project.connection_line_path(line.id);
  assert_eq!(line_path, "work/lines/1");
  assert_eq!(project.resolve_connection_line_path(&line_path), Some(line.id));

  assert_eq!(project.resolve_flow_path("work"), Some(work.id));
  assert!(project.resolve_component_path("work/components/missing").is_none());
  assert!(project.resolve_component_path("work/lines/0").is_none());
  assert!(project.resolve_connection_line_path("work/lines/99").is_none());
}

#[test]
fn test_unknown_output_is_rejected() {
  let mut def = sample_project();
  def["flows"][1]["connection_lines"][1]["output"] = json!("nope");

  let err = load(def).unwrap_err();
  assert!(matches!(err, FlowError::UnknownOutput { .. }));
}

#[test]
fn test_unknown_input_is_rejected() {
  let mut def = sample_project();
  def["flows"][1]["connection_lines"][1]["input"] = json!("nope");

  let err = load(def).unwrap_err();
  assert!(matches!(err, FlowError::UnknownInput { .. }));
}

#[test]
fn test_unknown_component_is_rejected() {
  let mut def = sample_project();
  def["flows"][1]["connection_lines"][0]["target"] = json!("ghost");

  let err = load(def).unwrap_err();
  assert!(matches!(err, FlowError::UnknownComponent { .. }));
}

#[test]
fn test_duplicate_names_are_rejected() {
  let mut def = sample_project();
  def["flows"][1]["name"] = json!("main");
  assert!(matches!(load(def).unwrap_err(), FlowError::DuplicateFlow(_)));

  let mut def = sample_project();
  def["flows"][1]["components"][1]["name"] = json!("start");
  assert!(matches!(
    load(def).unwrap_err(),
    FlowError::DuplicateComponent { .. }
  ));
}

#[test]
fn test_invalid_json_is_a_parse_error() {
  let err = Project::from_json("{ not json").unwrap_err();
  assert!(matches!(err, FlowError::Parse { .. }));
}
