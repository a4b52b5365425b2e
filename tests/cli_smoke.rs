// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI smoke tests: ingest a small handbook, then exercise every subcommand
//! offline with the dummy embedding provider and answers disabled.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn askbook(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("askbook"));
    cmd.current_dir(dir);
    cmd.env_remove("ANTHROPIC_API_KEY");
    cmd.env("NO_COLOR", "1");
    cmd
}

fn write_offline_config(dir: &Path) {
    fs::write(
        dir.join(".askbookrc.toml"),
        r#"
[store]
path = "warehouse.sqlite"

[embeddings]
provider = "dummy"

[answers]
enabled = false
"#,
    )
    .unwrap();
}

fn write_sections_jsonl(dir: &Path) -> std::path::PathBuf {
    let lines = [
        r#"{"school":"demo_u","school_name":"Demo University","handbook":"Student Handbook","academic_year":"2024-2025","section_id":"s1","title":"Academic Integrity Policy","category":"Academic Policies","content":"Students who plagiarize violate the academic integrity policy. Plagiarism happens when someone submits copied work. If a student chooses to plagiarize, disciplinary sanctions follow.","excerpt":"Plagiarism leads to disciplinary sanctions."}"#,
        r#"{"school":"demo_u","school_name":"Demo University","handbook":"Student Handbook","academic_year":"2024-2025","section_id":"s2","title":"Parking Permits","category":"Campus Services","content":"Vehicles on campus require a parking permit from the transportation office. Fines apply to unregistered vehicles left overnight."}"#,
        r#"{"school":"demo_u","school_name":"Demo University","handbook":"Student Handbook","academic_year":"2024-2025","section_id":"s3","title":"Housing Assignments","category":"Residence Life","content":"Residence hall rooms are assigned during spring through a lottery based on seniority and deposit date."}"#,
    ];
    let path = dir.join("sections.jsonl");
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn seeded_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_offline_config(dir.path());
    let jsonl = write_sections_jsonl(dir.path());
    askbook(dir.path())
        .arg("ingest")
        .arg(&jsonl)
        .assert()
        .success();
    dir
}

#[test]
fn ingest_reports_section_counts() {
    let dir = TempDir::new().unwrap();
    write_offline_config(dir.path());
    let jsonl = write_sections_jsonl(dir.path());

    askbook(dir.path())
        .arg("ingest")
        .arg(&jsonl)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ingested 3 sections across 1 handbooks"));
}

#[test]
fn schools_lists_ingested_tenants() {
    let dir = seeded_dir();

    let assert = askbook(dir.path())
        .args(["--json", "schools"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let schools: Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(schools[0]["slug"], "demo_u");
    assert_eq!(schools[0]["name"], "Demo University");
    assert_eq!(schools[0]["sections"], 3);
}

#[test]
fn ask_cites_the_matching_section() {
    let dir = seeded_dir();

    let assert = askbook(dir.path())
        .args(["--json", "ask", "What happens if I plagiarize?", "--school", "demo_u"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let outcome: Value = serde_json::from_str(&stdout).unwrap();

    let sources = outcome["sources"].as_array().unwrap();
    assert_eq!(sources[0]["title"], "Academic Integrity Policy");
    assert_eq!(sources[0]["category"], "Academic Policies");
    assert_eq!(sources[0]["section_id"], "s1");
    assert!(sources[0]["similarity"].as_f64().unwrap() > 0.0);

    let answer = outcome["answer"].as_str().unwrap();
    assert!(answer.contains("Academic Integrity Policy"));
    assert!(answer.contains("Demo University"));
}

#[test]
fn ask_without_school_prompts_and_exits_two() {
    let dir = seeded_dir();

    askbook(dir.path())
        .args(["ask", "anything"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Please specify which school you're asking about.",
        ));
}

#[test]
fn ask_unknown_school_apologizes_with_no_sources() {
    let dir = seeded_dir();

    let assert = askbook(dir.path())
        .args(["--json", "ask", "anything", "--school", "unknown_school"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let outcome: Value = serde_json::from_str(&stdout).unwrap();

    assert!(outcome["sources"].as_array().unwrap().is_empty());
    assert!(outcome["answer"].as_str().unwrap().contains("unknown_school"));
}

#[test]
fn status_and_warm_report_index_state() {
    let dir = seeded_dir();

    // One-shot process: a fresh run always starts unbuilt.
    askbook(dir.path())
        .args(["status", "--school", "demo_u"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unbuilt"));

    askbook(dir.path())
        .args(["warm", "--school", "demo_u"])
        .assert()
        .success()
        .stdout(predicate::str::contains("index ready (3 sections)"));

    askbook(dir.path())
        .args(["warm", "--school", "unknown_school"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not built"));
}

#[test]
fn human_output_numbers_sources() {
    let dir = seeded_dir();

    askbook(dir.path())
        .args(["ask", "What happens if I plagiarize?", "--school", "demo_u"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sources"))
        .stdout(predicate::str::contains("1. Academic Integrity Policy"));
}
