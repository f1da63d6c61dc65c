//! Smoke tests for the `stepflow` binary.

use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;

fn write_json(dir: &tempfile::TempDir, name: &str, value: &Value) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn simple_flow() -> Value {
    json!({
        "type": "sequence",
        "actions": [
            {"type": "set_variable", "name": "greeting", "value": "Hi ${name}!", "evaluate": true}
        ]
    })
}

#[test]
fn validate_accepts_a_well_formed_flow() {
    let dir = tempfile::tempdir().unwrap();
    let flow = write_json(&dir, "flow.json", &simple_flow());
    let output = Command::cargo_bin("stepflow")
        .unwrap()
        .arg("validate")
        .arg(&flow)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("valid"));
}

#[test]
fn validate_rejects_an_unknown_node_type() {
    let dir = tempfile::tempdir().unwrap();
    let flow = write_json(&dir, "flow.json", &json!({"type": "teleport"}));
    Command::cargo_bin("stepflow")
        .unwrap()
        .arg("validate")
        .arg(&flow)
        .assert()
        .failure();
}

#[test]
fn run_writes_an_execution_report() {
    let dir = tempfile::tempdir().unwrap();
    let flow = write_json(&dir, "flow.json", &simple_flow());
    let context = write_json(&dir, "context.json", &json!({"name": "Jo"}));
    let results = dir.path().join("report.json");

    Command::cargo_bin("stepflow")
        .unwrap()
        .arg("run")
        .arg(&flow)
        .arg("--context")
        .arg(&context)
        .arg("--results")
        .arg(&results)
        .assert()
        .success();

    let report: Value = serde_json::from_str(&fs::read_to_string(&results).unwrap()).unwrap();
    assert_eq!(report["result"]["success"], json!(true));
    assert_eq!(report["variables"]["greeting"], json!("Hi Jo!"));
}

#[test]
fn run_fails_when_the_flow_fails() {
    let dir = tempfile::tempdir().unwrap();
    // comparison against a variable that is never set
    let flow = write_json(
        &dir,
        "flow.json",
        &json!({
            "type": "if_then_else",
            "condition": {
                "type": "comparison",
                "left": "$missing",
                "operator": "EQUAL",
                "right": 1
            },
            "then": []
        }),
    );
    Command::cargo_bin("stepflow")
        .unwrap()
        .arg("run")
        .arg(&flow)
        .assert()
        .failure();
}
