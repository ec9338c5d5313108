use std::process::Command;
use std::time::{Duration, Instant};

use mutscore::oracle::{self, CommandOracle, Completion, OracleOutcome, TestOracle};
use tempfile::TempDir;

#[test]
fn zero_exit_passes() {
    let outcome = CommandOracle::new("true").run("", Duration::from_secs(10));
    assert!(matches!(outcome, OracleOutcome::Passed { .. }));
}

#[test]
fn nonzero_exit_fails() {
    let outcome = CommandOracle::new("false").run("", Duration::from_secs(10));
    assert!(matches!(outcome, OracleOutcome::Failed { .. }));
}

#[test]
fn missing_program_is_spawn_failure() {
    let outcome = CommandOracle::new("mutscore-no-such-program-xyz").run("", Duration::from_secs(10));
    match outcome {
        OracleOutcome::SpawnFailed { message } => assert!(message.contains("mutscore-no-such-program-xyz")),
        other => panic!("expected spawn failure, got {other:?}"),
    }
}

#[test]
fn overrunning_command_is_killed() {
    let start = Instant::now();
    let outcome = CommandOracle::new("sleep 5").run("", Duration::from_millis(200));
    assert!(matches!(outcome, OracleOutcome::TimedOut { .. }));
    assert!(start.elapsed() < Duration::from_secs(4), "child was not killed promptly");
}

#[test]
fn scope_is_appended_as_last_argument() {
    let outcome = CommandOracle::new("echo scope:").run("./pkg", Duration::from_secs(10));
    match outcome {
        OracleOutcome::Passed { output } => assert_eq!(output.trim(), "scope: ./pkg"),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn working_dir_is_honored() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "").unwrap();
    let outcome = CommandOracle::new("ls")
        .with_working_dir(dir.path())
        .run("", Duration::from_secs(10));
    match outcome {
        OracleOutcome::Passed { output } => assert!(output.contains("marker.txt")),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn stdout_and_stderr_are_captured() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo out; echo err >&2; exit 3"]);
    match oracle::run_with_deadline(cmd, Duration::from_secs(10)).unwrap() {
        Completion::Exited { success, output } => {
            assert!(!success);
            assert!(output.contains("out"));
            assert!(output.contains("err"));
        }
        other => panic!("unexpected completion {other:?}"),
    }
}

#[test]
fn timed_out_child_keeps_partial_output() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo started; sleep 5"]);
    match oracle::run_with_deadline(cmd, Duration::from_millis(500)).unwrap() {
        Completion::TimedOut { .. } => {}
        other => panic!("unexpected completion {other:?}"),
    }
}

#[test]
fn background_grandchild_does_not_outlive_timeout() {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", "echo done; sleep 6 & exit 0"]);
    let start = Instant::now();
    match oracle::run_with_deadline(cmd, Duration::from_secs(1)).unwrap() {
        Completion::Exited { success, output } => {
            assert!(success);
            assert!(output.contains("done"));
        }
        other => panic!("unexpected completion {other:?}"),
    }
    assert!(start.elapsed() < Duration::from_secs(3), "waited on inherited pipes");
}
