mod common;

use assert_cmd::Command;
use common::{facet, session, session_with_tools, write_facet_dir, write_jsonl};
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let mut sessions = vec![
        session_with_tools("s1", "/work/app", "2025-01-06T10:00:00Z", &[("Read", 20), ("Edit", 2)], 0),
        session_with_tools("s2", "/work/app", "2025-01-13T10:00:00Z", &[("Read", 15), ("Edit", 3)], 0),
        session_with_tools("s3", "/work/app", "2025-01-20T10:00:00Z", &[("Edit", 12), ("Read", 2)], 2),
        session_with_tools("s4", "/work/app", "2025-01-27T10:00:00Z", &[("Edit", 10), ("Read", 1)], 3),
    ];
    for record in &mut sessions {
        record.tool_errors = if matches!(record.session_id.as_str(), "s1" | "s2") { 5 } else { 1 };
    }
    sessions.push(session("s5", "/work/api", "2025-01-08T10:00:00Z"));
    write_jsonl(temp_dir.path(), "sessions.jsonl", &sessions).unwrap();
    write_facet_dir(
        temp_dir.path(),
        &[
            facet("s1", &[("wrong_approach", 1)]),
            facet("s2", &[("wrong_approach", 1)]),
            facet("s3", &[("wrong_approach", 1)]),
            facet("s4", &[("wrong_approach", 1)]),
        ],
    )
    .unwrap();
    temp_dir
}

fn cli(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("claude-insights").unwrap();
    cmd.env("LOG_LEVEL", "error")
        .env_remove("RUST_LOG")
        .arg("--sessions")
        .arg(dir.path().join("sessions.jsonl"))
        .arg("--facets")
        .arg(dir.path().join("facets"));
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn test_persistence_json() {
    let dir = fixture();
    let value = json_stdout(cli(&dir).args(["--json", "persistence"]));

    let pattern = &value["persistence"]["patterns"][0];
    assert_eq!(pattern["tag"], "wrong_approach");
    assert_eq!(pattern["trend"], "stable");
    assert_eq!(pattern["stale"], true);
    assert_eq!(value["persistence"]["totalSessions"], 4);
}

#[test]
fn test_confidence_json() {
    let dir = fixture();
    let value = json_stdout(cli(&dir).args(["confidence", "--json"]));

    let projects = value["confidence"]["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["projectPath"], "/work/app");
    let score = projects[0]["confidenceScore"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&score));
}

#[test]
fn test_effectiveness_json() {
    let dir = fixture();
    let value = json_stdout(cli(&dir).args([
        "--json",
        "effectiveness",
        "--project",
        "/work/app",
        "--changed-at",
        "2025-01-17T00:00:00Z",
    ]));

    let result = &value["effectiveness"][0];
    assert_eq!(result["verdict"], "effective");
    assert_eq!(result["before"]["sessions"], 2);
    assert_eq!(result["after"]["toolErrorRate"], 1.0);
}

#[test]
fn test_effectiveness_timeline_from_changes_file() {
    let dir = fixture();
    let changes = dir.path().join("changes.json");
    std::fs::write(
        &changes,
        r#"[{"projectPath": "/work/api", "changedAt": "2025-01-10T00:00:00Z"},
            {"projectPath": "/work/app", "changedAt": "2025-01-17T00:00:00Z"}]"#,
    )
    .unwrap();

    let value = json_stdout(cli(&dir).arg("--json").arg("effectiveness").arg("--changes").arg(&changes));

    let results = value["effectiveness"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["projectPath"], "/work/api");
    assert_eq!(results[0]["verdict"], "insufficient_data");
    assert_eq!(results[1]["verdict"], "effective");
}

#[test]
fn test_report_text() {
    let dir = fixture();
    cli(&dir)
        .arg("report")
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Friction Persistence"))
        .stdout(predicate::str::contains("Project Confidence"))
        .stdout(predicate::str::contains("wrong_approach"));
}

#[test]
fn test_missing_sessions_file_reports_json_error() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["--json", "persistence"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("\"error\""))
        .stdout(
            predicate::str::contains("Failed to read sessions file")
                .or(predicate::str::contains("Failed to access facets path")),
        );
}

#[test]
fn test_effectiveness_requires_project_or_changes() {
    let dir = fixture();
    cli(&dir)
        .arg("effectiveness")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--project"));
}

#[test]
fn test_invalid_change_instant_is_rejected() {
    let dir = fixture();
    cli(&dir)
        .args(["effectiveness", "--project", "/work/app", "--changed-at", "yesterday"])
        .assert()
        .failure();
}

fn empty_fixture() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("sessions.jsonl"), "").unwrap();
    std::fs::create_dir_all(temp_dir.path().join("facets")).unwrap();
    temp_dir
}

#[test]
fn test_empty_sessions_still_render_wrapped_reports() {
    let dir = empty_fixture();

    let value = json_stdout(cli(&dir).args([
        "--json",
        "effectiveness",
        "--project",
        "/p",
        "--changed-at",
        "2025-02-01T00:00:00Z",
    ]));
    assert_eq!(value["effectiveness"][0]["projectPath"], "/p");
    assert_eq!(value["effectiveness"][0]["verdict"], "insufficient_data");

    let value = json_stdout(cli(&dir).args(["--json", "persistence"]));
    assert!(value["persistence"]["patterns"].as_array().unwrap().is_empty());
    assert_eq!(value["persistence"]["totalSessions"], 0);

    let value = json_stdout(cli(&dir).args(["--json", "report"]));
    assert!(value["confidence"]["projects"].as_array().unwrap().is_empty());
    assert!(value["effectiveness"].as_array().unwrap().is_empty());
}
