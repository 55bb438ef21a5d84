use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const BIN: &str = "flowbridge";

/// Command isolated from the developer's config and fallback endpoint.
fn flowbridge(workspace: &TempDir) -> Command {
    let config = workspace.path().join("flowbridge.toml");
    if !config.exists() {
        fs::write(&config, "[batch]\nconcurrency = 2\n").expect("write config");
    }
    let mut command = Command::cargo_bin(BIN).expect("binary should build");
    command
        .current_dir(workspace.path())
        .env_remove("FLOWBRIDGE_FALLBACK_ENDPOINT")
        .env_remove("FLOWBRIDGE_LOG_DIR")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config);
    command
}

fn write_json(workspace: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = workspace.path().join(name);
    fs::write(&path, serde_json::to_string_pretty(value).expect("json")).expect("write workflow");
    path
}

fn lead_zap() -> Value {
    json!({
        "title": "Lead to Slack",
        "steps": [
            {"id": 1, "type": "trigger", "app": "webhook", "event": "catch_hook", "parameters": {"path": "lead"}},
            {"id": 2, "type": "action", "app": "slack", "event": "send_channel_message", "parameters": {"channel": "#leads"}}
        ]
    })
}

#[test]
fn help_lists_workflow_commands() {
    Command::cargo_bin(BIN)
        .expect("binary should build")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("WORKFLOW COMMANDS"))
        .stdout(predicate::str::contains("translate"))
        .stdout(predicate::str::contains("feasibility"))
        .stdout(predicate::str::contains("batch"));
}

#[test]
fn version_flag_prints_version() {
    Command::cargo_bin(BIN)
        .expect("binary should build")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn translate_help_shows_example() {
    Command::cargo_bin(BIN)
        .expect("binary should build")
        .args(["translate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--from"))
        .stdout(predicate::str::contains("flowbridge translate order-flow.json"));
}

#[test]
fn tools_lists_every_operation() {
    let workspace = TempDir::new().unwrap();
    let output = flowbridge(&workspace).arg("tools").output().expect("runs");
    assert!(output.status.success());
    let tools: Value = serde_json::from_slice(&output.stdout).expect("json output");
    let names: Vec<&str> = tools
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();
    assert_eq!(names.len(), 8);
    assert!(names.contains(&"translate_workflow"));
    assert!(names.contains(&"batch_translate_workflows"));
}

#[test]
fn capabilities_for_one_platform() {
    let workspace = TempDir::new().unwrap();
    let output = flowbridge(&workspace)
        .args(["capabilities", "zapier"])
        .output()
        .expect("runs");
    assert!(output.status.success());
    let capabilities: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(capabilities["zapier"]["loops"], false);
    assert!(capabilities.get("n8n").is_none());
}

#[test]
fn unknown_platform_fails() {
    let workspace = TempDir::new().unwrap();
    flowbridge(&workspace)
        .args(["capabilities", "ifttt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ifttt"));
}

#[test]
fn complexity_reports_difficulty() {
    let workspace = TempDir::new().unwrap();
    flowbridge(&workspace)
        .args(["complexity", "--from", "n8n", "--to", "zapier"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"difficulty\": \"hard\""));
}

#[test]
fn expression_is_rewritten() {
    let workspace = TempDir::new().unwrap();
    flowbridge(&workspace)
        .args(["expression", "{{2__total}}", "--from", "zapier", "--to", "make"])
        .assert()
        .success()
        .stdout(predicate::str::contains("{{2.total}}"));
}

#[test]
fn translate_writes_output_file() {
    let workspace = TempDir::new().unwrap();
    let input = write_json(&workspace, "zap.json", &lead_zap());
    let output_path = workspace.path().join("n8n.json");
    flowbridge(&workspace)
        .arg("translate")
        .arg(&input)
        .args(["--from", "zapier", "--to", "n8n", "-o"])
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": true"));

    let written: Value = serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
    let types: Vec<&str> = written["nodes"]
        .as_array()
        .expect("nodes")
        .iter()
        .filter_map(|node| node["type"].as_str())
        .collect();
    assert_eq!(types, vec!["n8n-nodes-base.webhook", "n8n-nodes-base.slack"]);
}

#[test]
fn translate_reads_stdin() {
    let workspace = TempDir::new().unwrap();
    flowbridge(&workspace)
        .args(["translate", "-", "--from", "zapier", "--to", "make", "--no-optimize"])
        .write_stdin(lead_zap().to_string())
        .assert()
        .success()
        .stdout(predicate::str::contains("slack:createMessage"));
}

#[test]
fn failed_translation_exits_nonzero() {
    let workspace = TempDir::new().unwrap();
    let input = write_json(&workspace, "empty.json", &json!({"name": "empty", "nodes": []}));
    flowbridge(&workspace)
        .arg("translate")
        .arg(&input)
        .args(["--from", "n8n", "--to", "make"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"success\": false"))
        .stderr(predicate::str::contains("workflow has no nodes to translate"));
}

#[test]
fn batch_reports_each_file() {
    let workspace = TempDir::new().unwrap();
    let good = write_json(&workspace, "good.json", &json!([lead_zap(), lead_zap()]));
    let bad = write_json(&workspace, "bad.json", &json!({"steps": "broken"}));
    let output = flowbridge(&workspace)
        .arg("batch")
        .arg(&good)
        .arg(&bad)
        .args(["--from", "zapier", "--to", "make", "--concurrency", "2"])
        .output()
        .expect("runs");
    assert!(!output.status.success());
    let batch: Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(batch["total"], 3);
    assert_eq!(batch["successful"], 2);
    assert!(String::from_utf8_lossy(&output.stderr).contains("1 of 3 workflows failed"));
}

#[test]
fn call_runs_a_tool_with_arguments_file() {
    let workspace = TempDir::new().unwrap();
    let args = write_json(
        &workspace,
        "args.json",
        &json!({"sourcePlatform": "zapier", "targetPlatform": "n8n"}),
    );
    flowbridge(&workspace)
        .args(["call", "get_translation_complexity", "--args"])
        .arg(&args)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"difficulty\": \"easy\""));
}

#[test]
fn call_unknown_tool_fails() {
    let workspace = TempDir::new().unwrap();
    flowbridge(&workspace)
        .args(["call", "export_to_airflow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FLOW-TOOL-001"));
}

#[test]
fn health_without_endpoint_succeeds() {
    let workspace = TempDir::new().unwrap();
    flowbridge(&workspace)
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"configured\": false"));
}
