#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn buildplan(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("buildplan").unwrap();
    cmd.current_dir(dir.path())
        .env("BUILDPLAN_ROOT", dir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// A water supply run over four timesteps: one reservoir already built, one
/// pipeline planned for 2011, and a desalination plant left undecided.
fn water_project(dir: &TempDir) {
    let root = dir.path();
    write(
        root,
        "runs/central.yaml",
        "name: central\ntimesteps: [2010, 2015, 2020, 2025]\nsector_models: [water_supply]\n",
    );
    write(
        root,
        "interventions/water_supply.yaml",
        "- name: reservoir\n  technical_lifetime:\n    value: 100\n    units: years\n  capacity: 500\n\
         - name: pipeline\n  technical_lifetime:\n    value: 12\n    units: years\n\
         - name: desalination\n  technical_lifetime:\n    value: 30\n    units: years\n",
    );
    write(
        root,
        "initial_conditions/water_supply.yaml",
        "- name: reservoir\n  build_year: 1995\n",
    );
    write(
        root,
        "strategies/central.yaml",
        "- type: pre-specified-planning\n  description: committed builds\n  interventions:\n    - name: pipeline\n      build_year: 2011\n",
    );
}

fn read_state(dir: &TempDir, timestep: i64, iteration: u32) -> String {
    std::fs::read_to_string(
        dir.path()
            .join(format!("results/central/decision_{iteration}/state_{timestep}.yaml")),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// buildplan run
// ---------------------------------------------------------------------------

#[test]
fn run_writes_state_for_every_timestep() {
    let dir = TempDir::new().unwrap();
    water_project(&dir);

    buildplan(&dir)
        .args(["run", "central"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 bundle(s) written"));

    for t in [2010, 2015, 2020, 2025] {
        assert!(read_state(&dir, t, 0).contains("reservoir"), "timestep {t}");
    }
    assert!(read_state(&dir, 2010, 0).contains("pipeline"));
    assert!(read_state(&dir, 2020, 0).contains("pipeline"));
    // Built 2011 with a 12 year lifetime: gone by 2025.
    assert!(!read_state(&dir, 2025, 0).contains("pipeline"));
    assert!(!read_state(&dir, 2015, 0).contains("desalination"));
}

#[test]
fn run_json_reports_bundles_and_planned() {
    let dir = TempDir::new().unwrap();
    water_project(&dir);

    let output = buildplan(&dir)
        .args(["run", "central", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["run"], "central");
    let bundles = value["bundles"].as_array().unwrap();
    assert_eq!(bundles.len(), 1);
    assert_eq!(bundles[0]["decision_iterations"], serde_json::json!([0]));
    assert_eq!(
        bundles[0]["timesteps"],
        serde_json::json!([2010, 2015, 2020, 2025])
    );
    assert!(bundles[0].get("decision_links").is_none());

    let planned = value["planned_interventions"].as_array().unwrap();
    assert!(planned.contains(&serde_json::json!("pipeline")));
    assert!(planned.contains(&serde_json::json!("reservoir")));
}

#[test]
fn run_without_strategies_writes_placeholder() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "runs/empty.yaml",
        "name: empty\ntimesteps: [2010, 2015]\nsector_models: [energy]\n",
    );

    buildplan(&dir).args(["run", "empty"]).assert().success();

    let state = std::fs::read_to_string(dir.path().join("results/empty/decision_0/state_2010.yaml"))
        .unwrap();
    let entries: Vec<serde_yaml::Value> = serde_yaml::from_str(&state).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], serde_yaml::Value::from(""));
}

#[test]
fn run_with_iteration_limit_strategy() {
    let dir = TempDir::new().unwrap();
    water_project(&dir);
    write(
        dir.path(),
        "strategies/central.yaml",
        "- type: rule-based\n  classname: IterationLimit\n  path: planning/limit.py\n  options:\n    max_iterations: 2\n",
    );

    let output = buildplan(&dir)
        .args(["run", "central", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let bundles = value["bundles"].as_array().unwrap();
    // Two iterations at each of four timesteps.
    assert_eq!(bundles.len(), 8);
    assert_eq!(bundles[0]["timesteps"], serde_json::json!([2010]));
    assert!(bundles[0].get("decision_links").is_none());
    assert_eq!(bundles[2]["timesteps"], serde_json::json!([2015]));
    assert!(bundles[2].get("decision_links").is_some());

    // Rule-based iterations count from 1; the last timestep finishes on 8.
    assert!(read_state(&dir, 2025, 8).contains("reservoir"));
}

#[test]
fn run_max_bundles_stops_early() {
    let dir = TempDir::new().unwrap();
    water_project(&dir);
    write(
        dir.path(),
        "strategies/central.yaml",
        "- type: rule-based\n  classname: RuleBased\n",
    );

    buildplan(&dir)
        .args(["run", "central", "--max-bundles", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 bundle(s) written"));

    assert!(dir.path().join("results/central/decision_3/state_2010.yaml").exists());
    assert!(!dir.path().join("results/central/decision_4").exists());
}

#[test]
fn run_unknown_run_fails() {
    let dir = TempDir::new().unwrap();
    buildplan(&dir)
        .args(["run", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn run_rejects_mixed_strategy_types() {
    let dir = TempDir::new().unwrap();
    water_project(&dir);
    write(
        dir.path(),
        "strategies/central.yaml",
        "- type: rule-based\n  classname: RuleBased\n- type: multi-objective\n  classname: Search\n",
    );

    buildplan(&dir)
        .args(["run", "central"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to set up decisions"));
}

// ---------------------------------------------------------------------------
// buildplan state
// ---------------------------------------------------------------------------

#[test]
fn state_lists_active_interventions() {
    let dir = TempDir::new().unwrap();
    water_project(&dir);
    buildplan(&dir).args(["run", "central"]).assert().success();

    buildplan(&dir)
        .args(["state", "central", "--timestep", "2015"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reservoir"))
        .stdout(predicate::str::contains("pipeline"))
        .stdout(predicate::str::contains("2011"));
}

#[test]
fn state_json_skips_placeholder() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "runs/empty.yaml",
        "name: empty\ntimesteps: [2010]\nsector_models: [energy]\n",
    );
    buildplan(&dir).args(["run", "empty"]).assert().success();

    buildplan(&dir)
        .args(["state", "empty", "--timestep", "2010", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn state_missing_fails() {
    let dir = TempDir::new().unwrap();
    water_project(&dir);
    buildplan(&dir)
        .args(["state", "central", "--timestep", "2010", "--iteration", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read state"));
}

// ---------------------------------------------------------------------------
// buildplan interventions
// ---------------------------------------------------------------------------

#[test]
fn interventions_lists_register() {
    let dir = TempDir::new().unwrap();
    water_project(&dir);

    buildplan(&dir)
        .args(["interventions", "central"])
        .assert()
        .success()
        .stdout(predicate::str::contains("desalination"))
        .stdout(predicate::str::contains("100 years"));
}

#[test]
fn interventions_available_excludes_planned() {
    let dir = TempDir::new().unwrap();
    water_project(&dir);

    let output = buildplan(&dir)
        .args(["interventions", "central", "--available", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["desalination"]);
}
