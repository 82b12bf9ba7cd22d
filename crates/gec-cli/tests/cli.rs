use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn gec() -> Command {
    Command::cargo_bin("gec-cli").unwrap()
}

#[test]
fn gec_validate_reports_sizes() {
    gec()
        .args(["validate", fixture("small_feeder.json").to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 buses"))
        .stdout(predicate::str::contains("2 users"))
        .stdout(predicate::str::contains("4 steps"));
}

#[test]
fn gec_validate_rejects_negative_comfort_price() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    let text = fs::read_to_string(fixture("small_feeder.json")).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
    value["prices"]["comfort_price"] = serde_json::json!(-1.0);
    fs::write(&path, value.to_string()).unwrap();

    gec()
        .args(["validate", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("comfort price"));
}

#[test]
fn gec_inspect_prints_component_counts() {
    gec()
        .args(["inspect", fixture("small_feeder.json").to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Binaries"))
        .stdout(predicate::str::contains("network"))
        .stdout(predicate::str::contains("heat-source"));
}

#[test]
fn gec_inspect_json_is_parseable() {
    let output = gec()
        .args(["inspect", fixture("small_feeder.json").to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // Two binaries per user and step
    assert_eq!(stats["binaries"], 2 * 2 * 4);
}

#[test]
fn gec_comfort_evaluates_envelope() {
    gec()
        .args([
            "comfort",
            fixture("small_feeder.json").to_str().unwrap(),
            "--temp",
            "19.5",
            "21",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("11.100"))
        .stdout(predicate::str::contains("8.200"));
}

#[test]
fn gec_solve_writes_artifacts() {
    let out_dir = tempdir().unwrap();
    gec()
        .args([
            "solve",
            fixture("small_feeder.json").to_str().unwrap(),
            "--out-dir",
            out_dir.path().to_str().unwrap(),
            "--name",
            "feeder",
            "--save-model",
            "--save-solution",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status"))
        .stdout(predicate::str::contains("Objective"));

    for suffix in [".lp", ".sol", ".json", "_users.csv", "_buses.csv"] {
        let path = out_dir.path().join(format!("feeder{suffix}"));
        assert!(path.exists(), "missing {}", path.display());
    }
}

#[test]
fn gec_solve_reads_toml_config() {
    let out_dir = tempdir().unwrap();
    let config = out_dir.path().join("gec.toml");
    fs::write(
        &config,
        format!(
            "[solver]\nmip_gap = 0.1\ntime_limit_secs = 60\n\n[output]\ndir = \"{}\"\nname = \"from_toml\"\n",
            out_dir.path().display()
        ),
    )
    .unwrap();

    gec()
        .args([
            "solve",
            fixture("small_feeder.json").to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success();
    assert!(out_dir.path().join("from_toml.json").exists());
}

#[test]
fn gec_solve_infeasible_writes_iis() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("export.json");
    let text = fs::read_to_string(fixture("small_feeder.json")).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
    // Night-time export that no household can deliver
    value["network"]["congestion"]["default_limit_mw"] = serde_json::json!(0.01);
    value["network"]["congestion"]["window_limit_mw"] = serde_json::json!(0.01);
    fs::write(&path, value.to_string()).unwrap();

    gec()
        .args([
            "solve",
            path.to_str().unwrap(),
            "--out-dir",
            dir.path().to_str().unwrap(),
            "--name",
            "export",
            "--save-iis",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("infeasible"))
        .stdout(predicate::str::contains("congestion"));
    assert!(dir.path().join("export.ilp").exists());
    assert!(!dir.path().join("export.json").exists());
}
