//! `switchboard parse` and `switchboard switches` end to end.

use std::fs;
use std::process::Command;

use assert_cmd::cargo;
use serde_json::{Value, json};

const META_JSON: &str = r#"{
  "v": 1.1,
  "args": {
    "dest": {"schema": "str", "req": true, "pos": 0},
    "tags": {"schema": ["array", {"of": "str"}]},
    "verbose": {"schema": "bool", "cmdline_aliases": {"v": {}}},
    "data": {"schema": "hash"}
  }
}"#;

const META_YAML: &str = "
v: 1.1
args:
  name:
    schema: str
    pos: 0
  count:
    schema: int
";

fn switchboard_cmd() -> Command {
    Command::new(cargo::cargo_bin!("switchboard"))
}

fn write_meta(file_name: &str, content: &str) -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(file_name);
    fs::write(&path, content).expect("write metadata");
    (dir, path.to_string_lossy().to_string())
}

fn run_json(args: &[&str]) -> (bool, Value) {
    let output = switchboard_cmd()
        .args(["--output", "json"])
        .args(args)
        .output()
        .expect("run switchboard");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("invalid json ({e}): {stdout}"));
    (output.status.success(), json)
}

#[test]
fn parse_success_envelope() {
    let (_dir, path) = write_meta("meta.json", META_JSON);
    let (ok, json) = run_json(&[
        "parse", "--meta", &path, "--", "--tags", "a", "-v", "out", "--tags", "b", "--data",
        "{k: 1}",
    ]);
    assert!(ok);
    assert_eq!(json["success"], true);
    assert_eq!(
        json["args"],
        json!({"dest": "out", "tags": ["a", "b"], "verbose": true, "data": {"k": 1}})
    );
    assert_eq!(json["leftover"], json!([]));
}

#[test]
fn missing_required_argument_envelope() {
    let (_dir, path) = write_meta("meta.json", META_JSON);
    let (ok, json) = run_json(&["parse", "--meta", &path, "--", "--no-verbose"]);
    assert!(!ok);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "missing_required_argument_error");
    assert_eq!(json["arg"], "dest");
}

#[test]
fn lenient_mode_keeps_unknown_tokens() {
    let (_dir, path) = write_meta("meta.json", r#"{"v": 1.1, "args": {"count": {"schema": "int"}}}"#);
    let (ok, json) = run_json(&[
        "parse", "--meta", &path, "--lenient", "--", "--bogus", "--count", "2",
    ]);
    assert!(ok);
    assert_eq!(json["args"], json!({"count": "2"}));
    assert_eq!(json["leftover"], json!(["--bogus"]));
}

#[test]
fn decode_failure_envelope() {
    let (_dir, path) = write_meta("meta.json", META_JSON);
    let (ok, json) = run_json(&["parse", "--meta", &path, "--lenient", "--", "--data", "{"]);
    assert!(!ok);
    assert_eq!(json["error"], "value_decode_error");
    assert_eq!(json["arg"], "data");
}

#[test]
fn yaml_metadata_is_detected_by_extension() {
    let (_dir, path) = write_meta("meta.yml", META_YAML);
    let (ok, json) = run_json(&["parse", "--meta", &path, "--", "--count", "3", "alice"]);
    assert!(ok);
    assert_eq!(json["args"], json!({"name": "alice", "count": "3"}));
}

#[test]
fn missing_metadata_file_is_command_failure() {
    let (ok, json) = run_json(&["parse", "--meta", "no-such-meta.json", "--", "x"]);
    assert!(!ok);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "command_failed");
    assert!(
        json["message"]
            .as_str()
            .is_some_and(|m| m.contains("failed to read metadata file")),
        "unexpected message: {}",
        json["message"]
    );
}

#[test]
fn switches_lists_compiled_table() {
    let (_dir, path) = write_meta("meta.json", META_JSON);
    let (ok, json) = run_json(&["switches", "--meta", &path, "--per-arg-json"]);
    assert!(ok);
    let names: Vec<&str> = json["switches"]
        .as_array()
        .expect("switch list")
        .iter()
        .filter_map(|s| s["switch"].as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "data",
            "data-json",
            "dest",
            "dest-json",
            "no-verbose",
            "tags",
            "tags-json",
            "v",
            "verbose"
        ]
    );
    let tags = json["switches"]
        .as_array()
        .and_then(|list| list.iter().find(|s| s["switch"] == "tags"))
        .expect("tags switch");
    assert_eq!(tags["action"], "append");
    assert_eq!(tags["arity"], "value");
}
