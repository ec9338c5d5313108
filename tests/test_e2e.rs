use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn mutscore(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mutscore"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run mutscore")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// A Go package whose only interesting line is line 42, plus a fake test
/// script that fails exactly when the boundary check is mutated to `<=`.
fn create_go_project(dir: &Path) -> String {
    let mut source = String::from("package main\n\n");
    for i in 3..=40 {
        source.push_str(&format!("// filler {i}\n"));
    }
    source.push_str("func small(x int) bool {\n");
    source.push_str("\tif x < 10 { return true }\n");
    source.push_str("\treturn false\n");
    source.push_str("}\n");
    std::fs::write(dir.join("main.go"), &source).unwrap();
    std::fs::write(
        dir.join("check.sh"),
        "if grep -q 'x <= 10' main.go; then echo 'FAIL: small(10)'; exit 1; fi\necho PASS\n",
    )
    .unwrap();
    source
}

fn generate(dir: &Path) -> Vec<serde_json::Value> {
    let output = mutscore(dir, &["generate", "main.go", "-o", "mutations.json"]);
    assert!(output.status.success(), "generate failed: {}", stderr(&output));
    let catalog = std::fs::read_to_string(dir.join("mutations.json")).unwrap();
    serde_json::from_str(&catalog).unwrap()
}

fn boundary_id(catalog: &[serde_json::Value]) -> String {
    catalog
        .iter()
        .find(|m| m["type"] == "relational_operator" && m["mutated"] == "<=")
        .map(|m| m["id"].as_str().unwrap().to_string())
        .expect("boundary mutation in catalog")
}

#[test]
fn e2e_generate_catalog() {
    let dir = TempDir::new().unwrap();
    create_go_project(dir.path());

    let catalog = generate(dir.path());
    assert!(!catalog.is_empty());
    assert_eq!(catalog[0]["id"], "M0");
    assert!(catalog.iter().all(|m| m["file"] == "main.go"));

    let boundary = catalog
        .iter()
        .find(|m| m["id"] == boundary_id(&catalog).as_str())
        .unwrap();
    assert_eq!(boundary["line"], 42);
    assert_eq!(boundary["column"], 7);
    assert_eq!(boundary["original"], "<");
}

#[test]
fn e2e_generate_to_stdout() {
    let dir = TempDir::new().unwrap();
    create_go_project(dir.path());

    let output = mutscore(dir.path(), &["generate", "main.go", "--lines", "42-42"]);
    assert!(output.status.success());
    let catalog: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(catalog.iter().all(|m| m["line"] == 42));
}

#[test]
fn e2e_functions() {
    let dir = TempDir::new().unwrap();
    create_go_project(dir.path());

    let output = mutscore(dir.path(), &["functions", "main.go"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "small");
}

#[test]
fn e2e_apply_prints_mutant_without_touching_file() {
    let dir = TempDir::new().unwrap();
    let source = create_go_project(dir.path());
    let catalog = generate(dir.path());
    let id = boundary_id(&catalog);

    let output = mutscore(dir.path(), &["apply", "-c", "mutations.json", "-i", &id]);
    assert!(output.status.success(), "{}", stderr(&output));

    let mutated = String::from_utf8_lossy(&output.stdout);
    assert_eq!(mutated.lines().nth(41), Some("\tif x <= 10 { return true }"));
    assert_eq!(mutated, source.replace("x < 10", "x <= 10"));
    assert_eq!(std::fs::read_to_string(dir.path().join("main.go")).unwrap(), source);
}

#[test]
fn e2e_test_kills_boundary_mutant_and_restores() {
    let dir = TempDir::new().unwrap();
    let source = create_go_project(dir.path());
    let catalog = generate(dir.path());
    let id = boundary_id(&catalog);

    let output = mutscore(
        dir.path(),
        &[
            "test", "-c", "mutations.json", "-i", &id, "-o", "result.json", "--test-cmd", "sh check.sh",
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let result: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("result.json")).unwrap()).unwrap();
    assert_eq!(result["status"], "killed");
    assert_eq!(result["mutation_id"], id.as_str());
    assert!(result["test_output"].as_str().unwrap().contains("FAIL"));

    assert_eq!(std::fs::read_to_string(dir.path().join("main.go")).unwrap(), source);
    assert!(!dir.path().join(".main.go.mutscore.bak").exists());
}

#[test]
fn e2e_batch_then_report() {
    let dir = TempDir::new().unwrap();
    let source = create_go_project(dir.path());
    generate(dir.path());

    let output = mutscore(
        dir.path(),
        &[
            "batch",
            "-c",
            "mutations.json",
            "--category",
            "relational_operator",
            "--max-concurrency",
            "3",
            "--test-cmd",
            "sh check.sh",
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("WARNING"), "concurrency clamp should warn");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("testing 5 mutations"), "{stdout}");
    assert!(stdout.contains("Mutation Testing Complete"));
    assert_eq!(std::fs::read_to_string(dir.path().join("main.go")).unwrap(), source);

    let results = std::fs::read_dir(dir.path().join("mutation-results")).unwrap().count();
    assert_eq!(results, 5);

    let output = mutscore(
        dir.path(),
        &["report", "--results", "mutation-results/*.json", "-o", "report.json"],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stderr(&output).contains("POOR"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["total_mutations"], 5);
    assert_eq!(report["killed"], 1);
    assert_eq!(report["survived"], 4);
    assert!((report["mutation_score"].as_f64().unwrap() - 20.0).abs() < 1e-9);
    assert_eq!(report["survivors_by_type"]["relational_operator"], 4);
}

#[test]
fn e2e_batch_in_subprocesses() {
    let dir = TempDir::new().unwrap();
    let source = create_go_project(dir.path());
    generate(dir.path());

    let output = mutscore(
        dir.path(),
        &[
            "batch",
            "-c",
            "mutations.json",
            "--category",
            "relational_operator",
            "--isolation",
            "subprocess",
            "--test-cmd",
            "sh check.sh",
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(std::fs::read_to_string(dir.path().join("main.go")).unwrap(), source);

    let killed = std::fs::read_dir(dir.path().join("mutation-results"))
        .unwrap()
        .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
        .filter(|json| json.contains("\"status\": \"killed\""))
        .count();
    assert_eq!(killed, 1);
}

#[test]
fn e2e_low_lines_are_skipped_by_default() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("main.go"),
        "package main\n\nfunc f(x int) bool {\n\treturn x > 1\n}\n",
    )
    .unwrap();
    generate(dir.path());

    let output = mutscore(dir.path(), &["batch", "-c", "mutations.json", "--test-cmd", "true"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("No mutations to test"));
}

#[test]
fn e2e_stale_backup_is_recovered_first() {
    let dir = TempDir::new().unwrap();
    let source = create_go_project(dir.path());
    let catalog = generate(dir.path());
    let id = boundary_id(&catalog);

    std::fs::write(dir.path().join("main.go"), "mutated leftovers").unwrap();
    std::fs::write(dir.path().join(".main.go.mutscore.bak"), &source).unwrap();

    let output = mutscore(
        dir.path(),
        &["test", "-c", "mutations.json", "-i", &id, "--test-cmd", "sh check.sh"],
    );
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(std::fs::read_to_string(dir.path().join("main.go")).unwrap(), source);
    assert!(!dir.path().join(".main.go.mutscore.bak").exists());
}

#[test]
fn e2e_restore_command() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("main.go"), "mutated").unwrap();
    std::fs::write(dir.path().join(".main.go.mutscore.bak"), "original").unwrap();

    let output = mutscore(dir.path(), &["restore", "main.go"]);
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(dir.path().join("main.go")).unwrap(), "original");

    let again = mutscore(dir.path(), &["restore", "main.go"]);
    assert!(again.status.success());
    assert!(stderr(&again).contains("nothing to restore"));
}

// --- input errors ---

#[test]
fn e2e_unknown_mutation_id() {
    let dir = TempDir::new().unwrap();
    create_go_project(dir.path());
    generate(dir.path());

    let output = mutscore(
        dir.path(),
        &["test", "-c", "mutations.json", "-i", "M999", "--test-cmd", "true"],
    );
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("M999"));
}

#[test]
fn e2e_unsupported_file_type() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

    let output = mutscore(dir.path(), &["generate", "notes.txt"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("unsupported file type"));
}

#[test]
fn e2e_invalid_function_name() {
    let dir = TempDir::new().unwrap();
    create_go_project(dir.path());

    let output = mutscore(dir.path(), &["generate", "main.go", "-f", "nonexistent"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = stderr(&output);
    assert!(stderr.contains("not found"), "{stderr}");
    assert!(stderr.contains("small"), "{stderr}");
}

#[test]
fn e2e_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    create_go_project(dir.path());
    std::fs::write(dir.path().join(".mutscore.toml"), "[run]\nbogus = 1\n").unwrap();

    let output = mutscore(dir.path(), &["generate", "main.go"]);
    assert_eq!(output.status.code(), Some(2));
}
