//! Integration tests for the CLI binary.
//!
//! Verifies that the `examctl` binary responds to basic flags and runs its
//! subcommands against a data directory.
//!
//! This test is registered as a [[test]] in the exam-certify-cli crate
//! so that CARGO_BIN_EXE_examctl is available.

use std::path::Path;
use std::process::Command;

/// Get a Command pointing to the `examctl` binary.
fn examctl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_examctl"))
}

/// Write a one-track catalog and one candidate whose window has expired.
fn seed(dir: &Path) {
    let catalog = serde_json::json!({
        "tracks": [{ "id": "rust", "modules": ["m1", "m2"] }],
        "questions": [
            {
                "id": "q1",
                "exam": { "track": "rust", "module": "m1" },
                "version": 1,
                "prompt": "Explain ownership",
                "points": 10,
                "reference_answer": "Each value has one owner",
                "is_published": true
            },
            {
                "id": "q2",
                "exam": { "track": "rust", "module": "m2" },
                "version": 1,
                "prompt": "Explain borrowing",
                "points": 10,
                "reference_answer": "Shared xor mutable",
                "is_published": true
            }
        ]
    });
    let candidates = serde_json::json!([
        {
            "id": "alice",
            "track": "rust",
            "window": { "started_at": 1, "expires_at": 2 }
        }
    ]);
    std::fs::write(dir.join("catalog.json"), catalog.to_string()).unwrap();
    std::fs::write(dir.join("candidates.json"), candidates.to_string()).unwrap();
}

#[test]
fn cli_responds_to_help() {
    let output = examctl()
        .arg("--help")
        .output()
        .expect("failed to execute examctl --help");

    assert!(
        output.status.success(),
        "examctl --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("examctl") || stdout.contains("ExamCertify") || stdout.contains("Usage"),
        "examctl --help output should contain usage information, got: {stdout}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = examctl()
        .arg("--version")
        .output()
        .expect("failed to execute examctl --version");

    assert!(
        output.status.success(),
        "examctl --version should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("0.1") || stdout.contains("examctl"),
        "examctl --version should contain version info, got: {stdout}"
    );
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = examctl()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute examctl");

    assert!(
        !output.status.success(),
        "examctl with unknown flag should exit with error"
    );
}

#[test]
fn cli_fails_without_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let output = examctl()
        .arg("--data-dir")
        .arg(dir.path())
        .arg("sweep")
        .output()
        .expect("failed to execute examctl sweep");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("catalog"), "stderr: {stderr}");
}

#[test]
fn cli_sweep_then_status() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let output = examctl()
        .arg("--data-dir")
        .arg(dir.path())
        .args(["--json", "sweep"])
        .output()
        .expect("failed to execute examctl sweep");
    assert!(
        output.status.success(),
        "sweep failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["examined"], 1);
    assert_eq!(report["processed"], 1);

    let output = examctl()
        .arg("--data-dir")
        .arg(dir.path())
        .args(["--json", "status", "--candidate", "alice"])
        .output()
        .expect("failed to execute examctl status");
    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let modules = status["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 2);
    assert!(modules.iter().all(|m| m["status"] == "completed"));
    assert!(modules.iter().all(|m| m["submission"] == "submitted"));
}

#[test]
fn cli_reevaluate_reports_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    seed(dir.path());

    let output = examctl()
        .arg("--data-dir")
        .arg(dir.path())
        .args(["reevaluate", "--candidate", "alice", "--track", "rust"])
        .output()
        .expect("failed to execute examctl reevaluate");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("incomplete"), "stdout: {stdout}");
}

#[test]
fn cli_verify_rejects_non_certificate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bogus.json");
    std::fs::write(&path, "{\"hello\": 1}").unwrap();

    let output = examctl()
        .arg("verify-certificate")
        .arg(&path)
        .output()
        .expect("failed to execute examctl verify-certificate");
    assert!(!output.status.success());
}
