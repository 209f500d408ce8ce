use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

const SCHEMA: &str = r#"{
  "models": {
    "Match": {
      "fields": [
        { "name": "matchId", "type": "integer", "minimum": 1 },
        { "name": "pts", "type": "integer", "default": 0 },
        { "name": "homeTeam", "type": "model", "model": "Team", "required": false },
        { "name": "players", "type": "array", "model": "Player" }
      ]
    },
    "Team": { "fields": [ { "name": "teamName", "type": "string" } ] },
    "Player": {
      "fields": [
        { "name": "playerId", "type": "integer" },
        { "name": "name", "type": "string", "required": false }
      ]
    }
  }
}"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// A command isolated from the user's environment and config files.
fn fieldset(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fieldset").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("FIELDSET_PRETTY")
        .env_remove("FIELDSET_FILTER_DEFAULT")
        .env_remove("FIELDSET_NOTIFY")
        .env_remove("FIELDSET_MINIFIED")
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_blueprint_prints_constraints() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);

    let output = fieldset(temp_dir.path())
        .args(["blueprint", "--schema"])
        .arg(&schema)
        .args(["--model", "Match"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let blueprint = stdout_json(&output);
    assert_eq!(blueprint["name"], "Match");
    assert_eq!(blueprint["fields"]["match_id"]["constraints"]["minimum"], 1);
    assert_eq!(blueprint["fields"]["home_team"]["name"], "Team");
}

#[test]
fn test_blueprint_unknown_model_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);

    fieldset(temp_dir.path())
        .args(["blueprint", "--schema"])
        .arg(&schema)
        .args(["--model", "Referee"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("unknown model Referee"));
}

#[test]
fn test_filter_with_nested_paths() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);

    let output = fieldset(temp_dir.path())
        .args(["--compact", "filter", "--off", "-s"])
        .arg(&schema)
        .args(["-m", "Match", "-e", "match_id", "-e", "players.name"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        r#"{"match_id":true,"players":{"name":true}}"#
    );
}

#[test]
fn test_project_from_stdin_with_filter() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);
    let filter = write(
        temp_dir.path(),
        "filter.json",
        r#"{ "match_id": true, "pts": false, "home_team": { "team_name": true }, "players": false }"#,
    );

    let output = fieldset(temp_dir.path())
        .args(["project", "--schema"])
        .arg(&schema)
        .args(["--model", "Match", "--filter"])
        .arg(&filter)
        .write_stdin(r#"{ "match_id": 7, "players": [] }"#)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output),
        json!({ "match_id": 7, "home_team": false })
    );
}

#[test]
fn test_project_full_record_from_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);
    let record = json!({
        "match_id": 7,
        "pts": 3,
        "home_team": { "team_name": "Owls" },
        "players": [{ "player_id": 1, "name": "Ada" }, { "player_id": 2, "name": null }]
    });
    let input = write(temp_dir.path(), "record.json", &record.to_string());

    let output = fieldset(temp_dir.path())
        .args(["project", "-s"])
        .arg(&schema)
        .args(["-m", "Match", "-i"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), record);
}

#[test]
fn test_project_set_reports_events() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);

    fieldset(temp_dir.path())
        .args(["project", "-s"])
        .arg(&schema)
        .args(["-m", "Match", "--set", "pts=5", "--set", "match_id=0"])
        .write_stdin(r#"{ "match_id": 7, "players": [] }"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pts\": 5"))
        .stderr(predicate::str::contains("pts: 0 -> 5"))
        .stderr(predicate::str::contains("Rejected 0 for match_id"))
        .stderr(predicate::str::contains("matchId: unchanged (7)"));
}

#[test]
fn test_project_unknown_filter_key_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);
    let filter = write(temp_dir.path(), "filter.json", r#"{ "referee": true }"#);

    fieldset(temp_dir.path())
        .args(["project", "-s"])
        .arg(&schema)
        .args(["-m", "Match", "-f"])
        .arg(&filter)
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("referee"));
}

#[test]
fn test_project_minified_from_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);
    write(temp_dir.path(), "fieldset.toml", "minified = true\npretty = false\n");

    fieldset(temp_dir.path())
        .args(["project", "-s"])
        .arg(&schema)
        .args(["-m", "Match"])
        .write_stdin(r#"{ "match_id": 7, "players": [] }"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("match_id").not())
        .stdout(predicate::str::contains("\n  ").not());
}

#[test]
fn test_env_overrides_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);
    write(temp_dir.path(), "fieldset.toml", "minified = true\n");

    fieldset(temp_dir.path())
        .env("FIELDSET_MINIFIED", "false")
        .args(["project", "-s"])
        .arg(&schema)
        .args(["-m", "Match"])
        .write_stdin(r#"{ "match_id": 7, "players": [] }"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("match_id"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);

    fieldset(temp_dir.path())
        .args(["--config", "missing.toml", "blueprint", "-s"])
        .arg(&schema)
        .args(["-m", "Team"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn test_validate_accepts_valid_record() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);

    fieldset(temp_dir.path())
        .args(["validate", "-s"])
        .arg(&schema)
        .args(["-m", "Match"])
        .write_stdin(r#"{ "match_id": 7, "players": [{ "player_id": 1 }] }"#)
        .assert()
        .success()
        .stderr(predicate::str::contains("Record is a valid Match"));
}

#[test]
fn test_validate_rejects_with_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);

    fieldset(temp_dir.path())
        .args(["validate", "-s"])
        .arg(&schema)
        .args(["-m", "Match"])
        .write_stdin(r#"{ "match_id": 7, "players": [{ "name": "Ada" }] }"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("players.0.player_id"));
}

#[test]
fn test_validate_with_filter_skips_hidden_fields() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(temp_dir.path(), "schema.json", SCHEMA);
    let filter = write(
        temp_dir.path(),
        "filter.json",
        r#"{ "match_id": false, "players": { "player_id": false } }"#,
    );
    let body = r#"{ "players": [{ "name": "Ada" }] }"#;

    fieldset(temp_dir.path())
        .args(["validate", "-s"])
        .arg(&schema)
        .args(["-m", "Match", "--filter"])
        .arg(&filter)
        .write_stdin(body)
        .assert()
        .success()
        .stderr(predicate::str::contains("Record is a valid Match"));

    fieldset(temp_dir.path())
        .args(["validate", "-s"])
        .arg(&schema)
        .args(["-m", "Match"])
        .write_stdin(body)
        .assert()
        .failure()
        .stderr(predicate::str::contains("match_id"));
}

#[test]
fn test_invalid_schema_document_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let schema = write(
        temp_dir.path(),
        "schema.json",
        r#"{ "models": { "A": { "fields": [ { "name": "b", "type": "model", "model": "A" } ] } } }"#,
    );

    fieldset(temp_dir.path())
        .args(["blueprint", "-s"])
        .arg(&schema)
        .args(["-m", "A"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));
}
