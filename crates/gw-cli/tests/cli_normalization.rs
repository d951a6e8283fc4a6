use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_getweights"))
}

fn repo_root() -> PathBuf {
    // crates/gw-cli -> repo root
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").canonicalize().unwrap()
}

fn fixture_path(name: &str) -> PathBuf {
    repo_root().join("tests/fixtures").join(name)
}

fn tmp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut dir = std::env::temp_dir();
    dir.push(format!("getweights_norm_{}_{}_{}", std::process::id(), nanos, tag));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

#[test]
fn sum_prints_tab_separated_totals() {
    let root = tmp_dir("sum");
    let dir = root.join("user.jdoe.410000.ttbar.e3698_p2375");
    fs::create_dir_all(&dir).unwrap();
    for f in ["a.root", "b.root", "c.root"] {
        fs::copy(fixture_path("cutflow.root"), dir.join(f)).unwrap();
    }
    let dids = root.join("dids.txt");
    fs::write(&dids, "# did sample\n999999 nothing_here\n").unwrap();
    let template = format!("{}/user.*.{{did}}.*/*.root", root.display());

    let out = run(&[
        "sum",
        "--did",
        "410000",
        "--did-list",
        dids.to_str().unwrap(),
        "--template",
        &template,
        "--retry-delay-ms",
        "0",
    ]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["410000\t12600", "999999\t0"]);
}

#[test]
fn sum_needs_a_did_placeholder() {
    let out = run(&["sum", "--did", "410000", "--template", "/data/*.root"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("{did}"));
}

#[test]
fn update_counts_writes_new_prefixed_file() {
    let root = tmp_dir("update");
    let weights = root.join("weights.json");
    fs::copy(fixture_path("weights.json"), &weights).unwrap();

    let counts = fixture_path("counts.list");
    let out =
        run(&["update-counts", weights.to_str().unwrap(), "--counts", counts.to_str().unwrap()]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));

    let updated = root.join("new_weights.json");
    let v: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&updated).unwrap()).unwrap();
    assert_eq!(v["410000"]["num events"].as_f64(), Some(8400.0));
    assert_eq!(v["410000"]["cross section"].as_f64(), Some(696.11));
    // Not in the count list.
    assert_eq!(v["361106"]["num events"].as_f64(), Some(0.0));

    let original: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&weights).unwrap()).unwrap();
    assert_eq!(original["410000"]["num events"].as_f64(), Some(4200.0));
}

#[test]
fn update_counts_converts_to_yaml_by_extension() {
    let root = tmp_dir("update_yaml");
    let output = root.join("weights.yml");
    let out = run(&[
        "update-counts",
        fixture_path("weights.json").to_str().unwrap(),
        "--counts",
        fixture_path("counts.list").to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value =
        serde_yaml::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(v["410000"]["num events"].as_f64(), Some(8400.0));
}
