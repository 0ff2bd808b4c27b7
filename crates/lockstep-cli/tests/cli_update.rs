use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MANIFEST: &str = r#"
[dependencies]
foo = "~> 1.0"
"#;

const LOCKFILE: &str = r#"
[[package]]
name = "foo"
version = "1.0.0"
dependencies = ["bar"]

[[package]]
name = "bar"
version = "1.0.0"
"#;

const SUCCESS: &str = r#"{"protocol":1,"status":"success","dependencies":[{"name":"foo","version":"1.2.0"},{"name":"bar","version":"1.0.0"}]}"#;

fn lockstep_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lockstep").unwrap();
    cmd.env("HOME", home).env_remove("LOCKSTEP_HELPER");
    cmd
}

fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("Lockstep.toml"), MANIFEST).unwrap();
    fs::write(tmp.path().join("Lockstep.lock"), LOCKFILE).unwrap();
    tmp
}

/// A helper that discards its request and prints `body`.
fn write_helper(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\ncat > /dev/null\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn echo_helper(dir: &Path, response: &str) -> PathBuf {
    write_helper(dir, "helper.sh", &format!("echo '{response}'"))
}

#[test]
fn test_update_prints_changes() {
    let tmp = project();
    let tools = TempDir::new().unwrap();
    let helper = echo_helper(tools.path(), SUCCESS);

    lockstep_cmd(tools.path())
        .current_dir(tmp.path())
        .args(["update", "foo", "1.2.0", "--helper"])
        .arg(&helper)
        .assert()
        .success()
        .stdout(predicate::str::contains("foo 1.0.0 -> 1.2.0"))
        .stdout(predicate::str::contains(
            r#"Lockstep.toml: "~> 1.0" -> "~> 1.2""#,
        ))
        .stderr(predicate::str::contains("1 change after 1 resolver attempt"));
}

#[test]
fn test_update_json_output() {
    let tmp = project();
    let tools = TempDir::new().unwrap();
    let helper = echo_helper(tools.path(), SUCCESS);

    let output = lockstep_cmd(tools.path())
        .args(["update", "foo", "1.2.0", "--json", "--path"])
        .arg(tmp.path())
        .arg("--helper")
        .arg(&helper)
        .output()
        .unwrap();
    assert!(output.status.success());

    let changes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let changes = changes.as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["name"], "foo");
    assert_eq!(changes[0]["previous_version"], "1.0.0");
    assert_eq!(changes[0]["new_version"], "1.2.0");
    assert_eq!(
        changes[0]["updated_requirements"][0]["constraint"],
        "~> 1.2"
    );
}

#[test]
fn test_update_strategy_flag() {
    let tmp = project();
    let tools = TempDir::new().unwrap();
    let helper = echo_helper(tools.path(), SUCCESS);

    lockstep_cmd(tools.path())
        .current_dir(tmp.path())
        .args(["update", "foo", "1.2.0", "--strategy", "pin-exact", "--helper"])
        .arg(&helper)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#"Lockstep.toml: "~> 1.0" -> "= 1.2.0""#,
        ));
}

#[test]
fn test_update_rejects_unknown_strategy() {
    let tmp = project();
    let tools = TempDir::new().unwrap();

    lockstep_cmd(tools.path())
        .current_dir(tmp.path())
        .args(["update", "foo", "1.2.0", "--strategy", "yolo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown update strategy"));
}

#[test]
fn test_update_unlocks_blamed_subdependency() {
    let tmp = project();
    let tools = TempDir::new().unwrap();
    let state = tools.path().join("called");
    let conflict = r#"{"protocol":1,"status":"version_conflict","message":"bar too old","conflicts":[{"requirement_trees":[{"nodes":[{"name":"foo","constraint":"~> 1.2"},{"name":"bar","constraint":"~> 2.0"}]}]}]}"#;
    let success = r#"{"protocol":1,"status":"success","dependencies":[{"name":"foo","version":"1.2.0"},{"name":"bar","version":"2.0.0"}]}"#;
    let helper = write_helper(
        tools.path(),
        "helper.sh",
        &format!(
            "if [ -f '{state}' ]; then\n  echo '{success}'\nelse\n  : > '{state}'\n  echo '{conflict}'\nfi",
            state = state.display()
        ),
    );

    lockstep_cmd(tools.path())
        .current_dir(tmp.path())
        .args(["update", "foo", "1.2.0", "--helper"])
        .arg(&helper)
        .assert()
        .success()
        .stdout(predicate::str::contains("foo 1.0.0 -> 1.2.0"))
        .stdout(predicate::str::contains("bar 1.0.0 -> 2.0.0"))
        .stderr(predicate::str::contains("2 changes after 2 resolver attempts"));
}

#[test]
fn test_update_single_fails_on_conflict() {
    let tmp = project();
    let tools = TempDir::new().unwrap();
    let conflict = r#"{"protocol":1,"status":"version_conflict","message":"bar too old","conflicts":[]}"#;
    let helper = echo_helper(tools.path(), conflict);

    lockstep_cmd(tools.path())
        .current_dir(tmp.path())
        .args(["update", "foo", "1.2.0", "--single", "--helper"])
        .arg(&helper)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unresolvable version conflict"));
}

#[test]
fn test_update_reports_helper_errors() {
    let tmp = project();
    let tools = TempDir::new().unwrap();
    let helper = echo_helper(
        tools.path(),
        r#"{"protocol":1,"status":"error","error_class":"ArgumentError","error_message":"bad input"}"#,
    );

    lockstep_cmd(tools.path())
        .current_dir(tmp.path())
        .args(["update", "foo", "1.2.0", "--helper"])
        .arg(&helper)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ArgumentError"));
}

#[test]
fn test_update_rejects_protocol_mismatch() {
    let tmp = project();
    let tools = TempDir::new().unwrap();
    let helper = echo_helper(
        tools.path(),
        r#"{"protocol":7,"status":"success","dependencies":[]}"#,
    );

    lockstep_cmd(tools.path())
        .current_dir(tmp.path())
        .args(["update", "foo", "1.2.0", "--helper"])
        .arg(&helper)
        .assert()
        .failure()
        .stderr(predicate::str::contains("mismatch"));
}

#[test]
fn test_update_helper_from_config() {
    let tmp = project();
    let tools = TempDir::new().unwrap();
    let helper = echo_helper(tools.path(), SUCCESS);
    let config_dir = tools.path().join(".lockstep");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        format!(
            "[update]\nstrategy = \"widen-range\"\n\n[resolver]\ncommand = \"{}\"\n",
            helper.display()
        ),
    )
    .unwrap();

    lockstep_cmd(tools.path())
        .current_dir(tmp.path())
        .args(["update", "foo", "1.2.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("foo 1.0.0 -> 1.2.0"))
        .stdout(predicate::str::contains("Lockstep.toml").not());
}

#[test]
fn test_update_without_helper_fails() {
    let tmp = project();
    let tools = TempDir::new().unwrap();

    lockstep_cmd(tools.path())
        .current_dir(tmp.path())
        .args(["update", "foo", "1.2.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no resolver helper configured"));
}

#[test]
fn test_update_outside_project_fails() {
    let tmp = TempDir::new().unwrap();

    lockstep_cmd(tmp.path())
        .current_dir(tmp.path())
        .args(["update", "foo", "1.2.0", "--helper", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find Lockstep.toml"));
}
