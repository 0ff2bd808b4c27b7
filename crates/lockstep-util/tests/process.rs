use lockstep_util::process::CommandBuilder;

#[test]
fn test_builder_simple_command() {
    let output = CommandBuilder::new("echo").arg("hello").exec().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "hello");
}

#[test]
fn test_builder_multiple_args() {
    let output = CommandBuilder::new("echo")
        .args(["one", "two", "three"])
        .exec()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "one two three");
}

#[cfg(unix)]
#[test]
fn test_builder_with_env() {
    let output = CommandBuilder::new("sh")
        .arg("-c")
        .arg("echo $MY_TEST_VAR")
        .env("MY_TEST_VAR", "lockstep_test_value")
        .exec()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "lockstep_test_value");
}

#[cfg(unix)]
#[test]
fn test_builder_with_cwd() {
    let tmp = tempfile::TempDir::new().unwrap();
    let marker = tmp.path().join("lockstep_cwd_test.marker");
    std::fs::write(&marker, "ok").unwrap();

    let output = CommandBuilder::new("ls")
        .arg("lockstep_cwd_test.marker")
        .cwd(tmp.path())
        .exec()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.trim().contains("lockstep_cwd_test.marker"));
}

#[cfg(unix)]
#[test]
fn test_builder_pipes_stdin() {
    let output = CommandBuilder::new("cat")
        .stdin("{\"protocol\":1}")
        .exec()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "{\"protocol\":1}");
}

#[cfg(unix)]
#[test]
fn test_builder_child_ignoring_stdin_still_returns_output() {
    let output = CommandBuilder::new("sh")
        .args(["-c", "echo done"])
        .stdin("x".repeat(1 << 20))
        .exec()
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "done");
}

#[test]
fn test_builder_nonexistent_program() {
    let result = CommandBuilder::new("nonexistent_program_xyz_123").exec();
    assert!(result.is_err());
}
