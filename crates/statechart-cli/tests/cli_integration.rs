//! Integration tests for the sc CLI.
//!
//! Run with: `cargo test --package statechart-cli --test cli_integration`

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const VALID: &str = r#"{
    "type": "statechart", "id": 1,
    "items": [
        {"type": "start", "id": 2, "x": 0, "y": 0},
        {"type": "state", "id": 3, "name": "Idle", "x": 20, "y": 0, "width": 100, "height": 60},
        {"type": "state", "id": 4, "name": "Busy", "x": 200, "y": 0, "width": 100, "height": 60},
        {"type": "transition", "id": 5, "srcId": 2, "dstId": 3},
        {"type": "transition", "id": 6, "srcId": 3, "dstId": 4, "event": "go"}
    ]
}"#;

const TWO_STARTS: &str = r#"{
    "type": "statechart", "id": 1,
    "items": [
        {"type": "start", "id": 2, "x": 0, "y": 0},
        {"type": "start", "id": 3, "x": 0, "y": 40},
        {"type": "state", "id": 4, "name": "Idle", "x": 20, "y": 0}
    ]
}"#;

// Transition 5 points at a state that no longer exists; region 7 is empty.
const BROKEN: &str = r#"{
    "type": "statechart", "id": 1,
    "items": [
        {"type": "state", "id": 2, "name": "A", "x": 0, "y": 0},
        {"type": "state", "id": 3, "name": "B", "x": 200, "y": 0,
         "items": [{"type": "statechart", "id": 7, "x": 0, "y": 30}]},
        {"type": "transition", "id": 4, "srcId": 2, "dstId": 3},
        {"type": "transition", "id": 5, "srcId": 2, "dstId": 99}
    ]
}"#;

/// Helper to run the sc CLI with an isolated config directory.
fn run_sc(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sc"))
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env_remove("SC_PASTE_OFFSET")
        .env_remove("SC_REPAIR_ON_COMMIT")
        .env_remove("SC_VALIDATE_ON_COMMIT")
        .env_remove("SC_PRETTY_JSON")
        .args(args)
        .output()
        .expect("Failed to execute sc command")
}

fn write_doc(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, json).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Collect the ids of every item of `kind` in a serialized document.
fn ids_of_type(value: &Value, kind: &str, out: &mut Vec<u64>) {
    if value["type"] == kind {
        if let Some(id) = value["id"].as_u64() {
            out.push(id);
        }
    }
    if let Some(items) = value["items"].as_array() {
        for item in items {
            ids_of_type(item, kind, out);
        }
    }
}

// =============================================================================
// Validate
// =============================================================================

#[test]
fn test_validate_accepts_valid_document() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "valid.json", VALID);

    let output = run_sc(temp.path(), &["validate", doc.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("is a valid statechart"));
}

#[test]
fn test_validate_rejects_second_start_state() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "starts.json", TWO_STARTS);

    let output = run_sc(temp.path(), &["validate", doc.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("region #1 has 2 start states"));
}

#[test]
fn test_validate_json_output() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "starts.json", TWO_STARTS);

    let output = run_sc(temp.path(), &["validate", "--json", doc.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let violations: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let violations = violations.as_array().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0]["kind"], "multiple_start_states");
    assert_eq!(violations[0]["count"], 2);
}

#[test]
fn test_validate_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    let output = run_sc(temp.path(), &["validate", "nope.json"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to read"));
}

#[test]
fn test_validate_malformed_document_fails() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "bad.json", r#"{"type": "state"}"#);

    let output = run_sc(temp.path(), &["validate", doc.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to load statechart"));
}

#[test]
fn test_validate_out_of_range_id_fails_cleanly() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(
        temp.path(),
        "huge.json",
        r#"{"type": "statechart", "items": [{"type": "state", "id": 18446744073709551615}]}"#,
    );

    let output = run_sc(temp.path(), &["validate", doc.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("out of range"));
    assert!(!stderr(&output).contains("panicked"));
}

// =============================================================================
// Repair
// =============================================================================

#[test]
fn test_repair_writes_document_to_stdout() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "broken.json", BROKEN);

    let output = run_sc(temp.path(), &["repair", doc.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let repaired: Value = serde_json::from_str(&stdout(&output)).unwrap();
    let mut transitions = Vec::new();
    ids_of_type(&repaired, "transition", &mut transitions);
    assert_eq!(transitions, vec![4]);

    let mut statecharts = Vec::new();
    ids_of_type(&repaired, "statechart", &mut statecharts);
    assert_eq!(statecharts, vec![1]);

    let report = stderr(&output);
    assert!(report.contains("Deleted transitions:   #5"));
    assert!(report.contains("Pruned regions:        #7"));
}

#[test]
fn test_repair_output_file_is_valid() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "broken.json", BROKEN);
    let out = temp.path().join("fixed.json");

    let output = run_sc(
        temp.path(),
        &["repair", doc.to_str().unwrap(), "-o", out.to_str().unwrap()],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).is_empty());
    assert!(out.exists());

    let output = run_sc(temp.path(), &["validate", out.to_str().unwrap()]);
    assert!(output.status.success());
}

#[test]
fn test_repair_clean_document_reports_nothing() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "valid.json", VALID);

    let output = run_sc(temp.path(), &["repair", doc.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("Nothing to repair"));
}

#[test]
fn test_repair_quiet_mode() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "broken.json", BROKEN);

    let output = run_sc(temp.path(), &["--quiet", "repair", doc.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stderr(&output).is_empty());
    assert!(serde_json::from_str::<Value>(&stdout(&output)).is_ok());
}

// =============================================================================
// Info
// =============================================================================

#[test]
fn test_info_json_structure() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "valid.json", VALID);

    let output = run_sc(temp.path(), &["info", "--json", doc.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let info: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(info["states"], 2);
    assert_eq!(info["pseudostates"], 1);
    assert_eq!(info["regions"], 0);
    assert_eq!(info["transitions"], 2);
    assert_eq!(info["top_level_states"], 3);
    assert_eq!(info["connected_components"], 1);
    assert_eq!(info["has_cycles"], false);
    assert_eq!(info["valid"], true);
}

#[test]
fn test_info_human_output() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "valid.json", VALID);

    let output = run_sc(temp.path(), &["info", doc.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Statechart Info"));
    assert!(text.contains("Transitions:      2"));
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn test_config_show() {
    let temp = TempDir::new().unwrap();
    let output = run_sc(temp.path(), &["config", "show"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Statechart CLI Configuration"));
    assert!(text.contains("paste_offset:"));
}

#[test]
fn test_config_set_then_get() {
    let temp = TempDir::new().unwrap();

    let output = run_sc(temp.path(), &["config", "set", "paste-offset", "24"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = run_sc(temp.path(), &["config", "get", "paste_offset"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "24");

    let output = run_sc(temp.path(), &["config", "reset"]);
    assert!(output.status.success());
    let output = run_sc(temp.path(), &["config", "get", "paste_offset"]);
    assert_eq!(stdout(&output).trim(), "16");
}

#[test]
fn test_config_rejects_unknown_key() {
    let temp = TempDir::new().unwrap();
    let output = run_sc(temp.path(), &["config", "set", "colour", "blue"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown config key"));
}

#[test]
fn test_config_env_override() {
    let temp = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_sc"))
        .current_dir(temp.path())
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join("config"))
        .env("SC_PRETTY_JSON", "false")
        .args(["config", "get", "pretty_json"])
        .output()
        .expect("Failed to execute sc command");
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "false");
}

#[test]
fn test_config_path() {
    let temp = TempDir::new().unwrap();
    let output = run_sc(temp.path(), &["config", "path"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("config.json"));
}

#[test]
fn test_verbose_mode() {
    let temp = TempDir::new().unwrap();
    let doc = write_doc(temp.path(), "valid.json", VALID);
    let output = run_sc(temp.path(), &["--verbose", "validate", doc.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("opened document"));
}
