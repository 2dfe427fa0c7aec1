use assert_cmd::prelude::*;
use predicates::prelude::*;

use std::process::Command;

fn cpusched() -> Command {
    let mut cmd = Command::cargo_bin("cpusched").expect("Calling binary failed");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// same as `cpusched`, but able to feed stdin
fn cpusched_with_stdin() -> assert_cmd::Command {
    assert_cmd::Command::from_std(cpusched())
}

#[test]
fn test_cli() {
    cpusched().assert().failure();
}

#[test]
fn test_version() {
    let expected_version = "cpusched 0.1.0\n";
    cpusched().arg("--version").assert().stdout(expected_version);
}

#[test]
fn test_config_dump() {
    cpusched()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("type: inline"))
        .stdout(predicate::str::contains("round-robin"));
}

#[test]
fn test_run_default_workload() {
    cpusched()
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Round Robin (Q=2) Gantt Chart ==="))
        .stdout(predicate::str::contains("===== Shortest Remaining Time (SRT, Preemptive SJF) Results ====="))
        .stdout(predicate::str::contains("Total Waiting Time: 39"));
}

#[test]
fn test_run_from_file_as_json() {
    let output = cpusched()
        .args(&["run", "-i", "tests/fixtures/textbook.txt", "-a", "sjn", "-a", "pp", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let runs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let runs = runs.as_array().unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0]["algorithm"], "shortest-job-next");
    assert_eq!(runs[0]["metrics"]["total_turnaround"], 43);
    assert_eq!(runs[1]["algorithm"], "priority-preemptive");
    assert_eq!(runs[1]["metrics"]["total_waiting"], 22);
}

#[test]
fn test_run_from_stdin() {
    assert_cmd::Command::cargo_bin("cpusched")
        .unwrap()
        .env_remove("RUST_LOG")
        .args(&["run", "-i", "-", "-q", "1", "-a", "rr", "-f", "csv"])
        .write_stdin("0,5,2\n1,3,1\n2,8,3\n3,6,1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("rr,1,1,3,1,1,9,8,5"));
}

#[test]
fn test_format_from_env() {
    cpusched()
        .env("CPUSCHED_OUTPUT__FORMAT", "csv")
        .args(&["run", "-a", "srt"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "algorithm,pid,arrival,burst,priority,start,completion,turnaround,waiting\n",
        ));
}

#[test]
fn test_chrome_trace() {
    let dir = std::env::temp_dir().join(format!("cpusched-cli-{}", std::process::id()));
    cpusched()
        .env("CPUSCHED_OUTPUT_DIR", &dir)
        .args(&["run", "--chrome-trace", "-a", "rr"])
        .assert()
        .success();

    let trace: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(dir.join("trace.json")).unwrap()).unwrap();
    assert!(!trace["traceEvents"].as_array().unwrap().is_empty());
    assert_eq!(trace["config"]["algorithms"][0], "round-robin");
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_invalid_workload() {
    assert_cmd::Command::cargo_bin("cpusched")
        .unwrap()
        .env_remove("RUST_LOG")
        .args(&["run", "-i", "-"])
        .write_stdin("0,5,2\n1,0,1\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Error: invalid workload: P1 has burst 0, burst must be positive",
        ));
}

#[test]
fn test_run_counted_input_with_quantum_line() {
    // count, triples, then the Round Robin quantum
    let input = "4\n0,5,2\n1,3,1\n2,8,3\n3,6,1\n1\n";
    cpusched_with_stdin()
        .args(&["run", "-i", "-", "-a", "rr", "-f", "csv"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("rr,1,1,3,1,1,9,8,5"));

    // the command line quantum wins over the input
    cpusched_with_stdin()
        .args(&["run", "-i", "-", "-q", "2", "-a", "rr", "-f", "csv"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("rr,1,1,3,1,2,11,10,7"));
}

#[test]
fn test_count_mismatch() {
    cpusched_with_stdin()
        .args(&["run", "-i", "-", "-a", "sjn"])
        .write_stdin("3\n0,5,2\n1,3,1\n2\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("input announces 3 processes but lists 2"));
}

#[test]
fn test_time_overflow() {
    cpusched_with_stdin()
        .args(&["run", "-i", "-", "-a", "sjn"])
        .write_stdin("0,9223372036854775807,0\n0,9223372036854775807,0\n0,9223372036854775807,0\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not fit in the simulated time range"));
}

#[test]
fn test_unknown_algorithm() {
    cpusched_with_stdin()
        .args(&["run", "-a", "fifo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown algorithm"));
}
