use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

fn dockyard() -> assert_cmd::Command {
    cargo_bin_cmd!("dockyard")
}

fn project_with(config: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("dockyard.toml"), config).unwrap();
    std::fs::write(tmp.path().join("requirements.txt"), "streamlit==1.38.0\n").unwrap();
    std::fs::write(tmp.path().join("app.py"), "import streamlit as st\n").unwrap();
    tmp
}

// ── Help / Version ──

#[test]
fn shows_help() {
    dockyard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Build, launch, and verify container images",
        ));
}

#[test]
fn shows_version() {
    dockyard()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dockyard"));
}

// ── Init Command ──

#[test]
fn init_writes_config() {
    let tmp = TempDir::new().unwrap();

    dockyard()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created dockyard.toml"));

    let content = std::fs::read_to_string(tmp.path().join("dockyard.toml")).unwrap();
    assert!(content.contains("[launch]"));
    assert!(content.contains("[system]"));
}

#[test]
fn init_keeps_existing_config() {
    let tmp = project_with("[launch]\nport = 9000\n");

    dockyard()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stderr(predicate::str::contains("already exists"));

    let content = std::fs::read_to_string(tmp.path().join("dockyard.toml")).unwrap();
    assert_eq!(content, "[launch]\nport = 9000\n");
}

// ── Plan Command ──

#[test]
fn plan_lists_stages_in_order() {
    let tmp = TempDir::new().unwrap();

    let output = dockyard()
        .current_dir(tmp.path())
        .arg("plan")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();

    let positions: Vec<usize> = [
        "1. base-runtime",
        "2. environment",
        "3. system-packages",
        "4. dependencies",
        "5. source",
        "6. expose",
        "7. launch",
    ]
    .iter()
    .map(|needle| stdout.find(needle).unwrap_or_else(|| panic!("{needle} missing")))
    .collect();

    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(stdout.contains("dockyard-app:latest"));
}

#[test]
fn plan_json_is_machine_readable() {
    let tmp = project_with("[launch]\nport = 9000\n");

    let output = dockyard()
        .current_dir(tmp.path())
        .args(["plan", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stages: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let stages = stages.as_array().unwrap();
    assert_eq!(stages.len(), 7);
    assert_eq!(stages[5]["name"], "expose");
    assert_eq!(stages[5]["detail"], "expose 9000/tcp");
}

// ── Render Command ──

#[test]
fn render_prints_reference_dockerfile() {
    let tmp = TempDir::new().unwrap();

    dockyard()
        .current_dir(tmp.path())
        .arg("render")
        .assert()
        .success()
        .stdout(predicate::str::contains("FROM python:3.11-slim"))
        .stdout(predicate::str::contains("ENV PYTHONUNBUFFERED=\"1\""))
        .stdout(predicate::str::contains("--no-install-recommends graphviz build-essential curl"))
        .stdout(predicate::str::contains("EXPOSE 8501"))
        .stdout(predicate::str::contains(
            r#"CMD ["streamlit","run","app.py","--server.port=8501","--server.address=0.0.0.0"]"#,
        ));
}

#[test]
fn render_rejects_invalid_toml() {
    let tmp = project_with("[launch\nport = ");

    dockyard()
        .current_dir(tmp.path())
        .arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config"));
}

#[test]
fn render_rejects_required_env_override() {
    let tmp = project_with("[env]\nPYTHONUNBUFFERED = \"0\"\n");

    dockyard()
        .current_dir(tmp.path())
        .arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PYTHONUNBUFFERED"));
}

#[test]
fn render_rejects_zero_port() {
    let tmp = project_with("[launch]\nport = 0\n");

    dockyard()
        .current_dir(tmp.path())
        .arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("launch port"));
}

// ── Eject Command ──

#[test]
fn eject_creates_dockerfile_in_state_dir() {
    let tmp = project_with("");

    dockyard()
        .current_dir(tmp.path())
        .arg("eject")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ejected"));

    let dockerfile = std::fs::read_to_string(tmp.path().join(".dockyard/Dockerfile")).unwrap();
    assert!(dockerfile.starts_with("# === Base runtime ==="));
    assert!(dockerfile.contains("COPY requirements.txt ./requirements.txt"));
}

#[test]
fn eject_fails_on_second_run() {
    let tmp = project_with("");

    dockyard()
        .current_dir(tmp.path())
        .arg("eject")
        .assert()
        .success();

    dockyard()
        .current_dir(tmp.path())
        .arg("eject")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already ejected"));
}

#[test]
fn render_prefers_ejected_dockerfile() {
    let tmp = project_with("");
    std::fs::create_dir(tmp.path().join(".dockyard")).unwrap();
    std::fs::write(
        tmp.path().join(".dockyard/Dockerfile"),
        "FROM python:3.12-slim\n# hand edited\n",
    )
    .unwrap();

    dockyard()
        .current_dir(tmp.path())
        .arg("render")
        .assert()
        .success()
        .stdout(predicate::str::contains("# hand edited"))
        .stdout(predicate::str::contains("3.11").not());
}

// ── Build Command (no engine) ──

#[test]
fn build_fails_without_manifest() {
    let tmp = TempDir::new().unwrap();

    dockyard()
        .current_dir(tmp.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("requirements.txt"));

    assert!(!tmp.path().join(".dockyard-bundle").exists());
    assert!(!tmp.path().join(".dockyard/build-state.json").exists());
}

#[test]
fn build_rejects_invalid_package_before_engine() {
    let tmp = project_with("[system]\npackages = [\"curl; rm -rf /\"]\n");

    dockyard()
        .current_dir(tmp.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid system package name"));
}

// ── Doctor Command ──

#[test]
fn doctor_reports_missing_manifest() {
    let tmp = TempDir::new().unwrap();

    dockyard()
        .current_dir(tmp.path())
        .arg("doctor")
        .assert()
        .failure()
        .stdout(predicate::str::contains("requirements.txt not found"))
        .stderr(predicate::str::contains("some checks failed"));
}
