//! End-to-end tests that run the `monforge` binary against local-directory hosts

use assert_cmd::Command;
use mon_test_utils::descriptor::SAMPLE_DESCRIPTOR_JSON;
use mon_test_utils::workspace::{LocalConfig, TestWorkspace};
use predicates::prelude::*;
use std::path::Path;

/// Get a Command for the monforge binary
fn monforge() -> Command {
    let mut cmd = Command::cargo_bin("monforge").expect("Failed to find monforge binary");
    cmd.env_remove("MONFORGE_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn with_config(ws: &TestWorkspace, local: &LocalConfig) -> Command {
    let config = ws.write_config(local);
    let mut cmd = monforge();
    cmd.arg("--config").arg(config).current_dir(ws.root());
    cmd
}

fn descriptor(ws: &TestWorkspace) -> String {
    ws.write_descriptor(SAMPLE_DESCRIPTOR_JSON).display().to_string()
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

// ============================================================================
// Help and discovery
// ============================================================================

#[test]
fn help_lists_commands() {
    monforge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy-artifacts"))
        .stdout(predicate::str::contains("validate-import"));
}

#[test]
fn protocols_lists_builtins_without_config() {
    let temp = tempfile::TempDir::new().unwrap();
    monforge()
        .current_dir(temp.path())
        .arg("protocols")
        .assert()
        .success()
        .stdout(predicate::str::contains("Check Protocols"))
        .stdout(predicate::str::contains("tcp"))
        .stdout(predicate::str::contains("http"));
}

// ============================================================================
// generate
// ============================================================================

#[test]
fn generate_writes_every_environment() {
    let ws = TestWorkspace::new();
    let descriptor = descriptor(&ws);
    let out = ws.out_dir();

    with_config(&ws, &LocalConfig::default())
        .args(["generate", &descriptor, "--out", &path_arg(&out), "--check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("EXP"))
        .stdout(predicate::str::contains("consistent"));

    for env in ["EXP", "DEV"] {
        assert!(out.join(env).join("manifest.json").is_file(), "{} manifest", env);
        assert!(out.join(env).join("checks").join("hosts.cfg").is_file());
        assert!(out.join(env).join("logs").join("logstash.conf").is_file());
    }
}

#[test]
fn generate_rejects_invalid_descriptor() {
    let ws = TestWorkspace::new();
    let path = ws.write_descriptor(r#"{"identification": {"priority": "Alta"}}"#);

    with_config(&ws, &LocalConfig::default())
        .args(["generate", &path_arg(&path)])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn generate_rejects_unknown_environment() {
    let ws = TestWorkspace::new();
    let descriptor = descriptor(&ws);

    with_config(&ws, &LocalConfig::default())
        .args(["generate", &descriptor, "--env", "PRE"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown environment 'PRE'"));
}

// ============================================================================
// deploy
// ============================================================================

#[test]
fn deploy_without_config_is_an_input_error() {
    let ws = TestWorkspace::new();
    let descriptor = descriptor(&ws);

    monforge()
        .current_dir(ws.root())
        .args(["deploy", &descriptor, "--env", "EXP"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn dry_run_deploy_touches_no_host() {
    let ws = TestWorkspace::new();
    let descriptor = descriptor(&ws);

    with_config(&ws, &LocalConfig::default())
        .args(["deploy", &descriptor, "--env", "EXP", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dry-run"))
        .stdout(predicate::str::contains("would write /etc/nagios/objects/hosts.cfg"));

    assert!(!ws.host_root("web-01").exists());
    assert!(!ws.state_dir().join("backups.jsonl").exists());
}

#[test]
fn partial_failure_exits_with_five() {
    let ws = TestWorkspace::new();
    let descriptor = descriptor(&ws);
    ws.fail_validation_on("web-01");

    let output = with_config(&ws, &LocalConfig::default())
        .args(["deploy", &descriptor, "--env", "EXP", "--json"])
        .assert()
        .code(5)
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["status"], "partially-failed");
    assert_eq!(report["hosts"][0]["host"], "web-01");
    assert_eq!(report["hosts"][0]["rolled_back"], true);
    assert_eq!(report["hosts"][0]["error"]["kind"], "validation");
    assert!(ws.read_host_file("web-02", "/etc/nagios/objects/services.cfg").is_some());
    assert!(ws.read_host_file("web-01", "/etc/nagios/objects/services.cfg").is_none());
}

#[test]
fn validation_failure_on_every_host_exits_with_three() {
    let ws = TestWorkspace::new();
    let descriptor = descriptor(&ws);
    ws.fail_validation_on("payments-dev");

    with_config(&ws, &LocalConfig::default())
        .args(["deploy", &descriptor, "--env", "DEV", "--checks-only"])
        .assert()
        .code(3);
}

#[test]
fn deploy_artifacts_uses_generated_files() {
    let ws = TestWorkspace::new();
    let descriptor = descriptor(&ws);
    let out = ws.out_dir();

    with_config(&ws, &LocalConfig::default())
        .args(["generate", &descriptor, "--env", "EXP", "--out", &path_arg(&out)])
        .assert()
        .success();
    let generated = std::fs::read_to_string(out.join("EXP").join("checks").join("services.cfg")).unwrap();

    with_config(&ws, &LocalConfig::default())
        .args(["deploy-artifacts", &path_arg(&out.join("EXP")), "--logs-only"])
        .assert()
        .success();
    assert!(ws.read_host_file("web-01", "/etc/filebeat/filebeat.yml").is_some());
    assert!(ws.read_host_file("web-01", "/etc/nagios/objects/services.cfg").is_none());

    with_config(&ws, &LocalConfig::default())
        .args(["deploy-artifacts", &path_arg(&out.join("EXP"))])
        .assert()
        .success();
    assert_eq!(ws.read_host_file("web-02", "/etc/nagios/objects/services.cfg"), Some(generated));

    with_config(&ws, &LocalConfig::default())
        .args(["backups", "list", "--host", "web-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web-01"))
        .stdout(predicate::str::contains("web-02").not());
}

#[test]
fn tampered_artifacts_are_refused() {
    let ws = TestWorkspace::new();
    let descriptor = descriptor(&ws);
    let out = ws.out_dir();

    with_config(&ws, &LocalConfig::default())
        .args(["generate", &descriptor, "--env", "EXP", "--out", &path_arg(&out)])
        .assert()
        .success();
    std::fs::write(out.join("EXP").join("checks").join("hosts.cfg"), "# edited\n").unwrap();

    with_config(&ws, &LocalConfig::default())
        .args(["deploy-artifacts", &path_arg(&out.join("EXP"))])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("modified after generation"));
    assert!(!ws.host_root("web-01").exists());
}

// ============================================================================
// staged import
// ============================================================================

#[test]
fn stage_then_validate_import() {
    let ws = TestWorkspace::new();
    let descriptor = descriptor(&ws);

    with_config(&ws, &LocalConfig::default())
        .args(["stage", &descriptor, "--env", "EXP"])
        .assert()
        .success()
        .stdout(predicate::str::contains("awaiting-manual-step"))
        .stdout(predicate::str::contains("monforge validate-import"));

    let output = with_config(&ws, &LocalConfig::default())
        .args(["sessions", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let sessions: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let id = sessions[0]["id"].as_str().unwrap().to_string();

    with_config(&ws, &LocalConfig::default())
        .args(["validate-import", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("validated"));

    with_config(&ws, &LocalConfig::default())
        .args(["validate-import", &id])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires awaiting-manual-step"));
}

#[test]
fn failed_import_verification_exits_with_three() {
    let ws = TestWorkspace::new();
    let descriptor = descriptor(&ws);
    let local = LocalConfig {
        verify_commands: vec!["false".to_string()],
        ..Default::default()
    };

    with_config(&ws, &local)
        .args(["stage", &descriptor, "--env", "EXP"])
        .assert()
        .success();
    let output = with_config(&ws, &local)
        .args(["sessions", "--json", "--env", "exp"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let sessions: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let id = sessions[0]["id"].as_str().unwrap().to_string();

    with_config(&ws, &local)
        .args(["validate-import", &id[..8]])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("failed"));
}

#[test]
fn unknown_session_is_an_input_error() {
    let ws = TestWorkspace::new();
    with_config(&ws, &LocalConfig::default())
        .args(["validate-import", "deadbeef"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Session not found"));
}
