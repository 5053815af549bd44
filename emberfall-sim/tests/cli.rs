use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "emberfall-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_strategies_writes_output() {
    let exe = env!("CARGO_BIN_EXE_emberfall-sim");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-strategies", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available strategies"));
    assert!(content.contains("Tactician"));
}

#[test]
fn cli_json_report_is_parseable() {
    let exe = env!("CARGO_BIN_EXE_emberfall-sim");
    let output_path = temp_path("json");
    let status = Command::new(exe)
        .args([
            "--strategies",
            "brawler,cautious",
            "--seeds",
            "1,2",
            "--battles",
            "4",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("json report");
    assert_eq!(report["campaigns"].as_array().map(Vec::len), Some(4));
    assert_eq!(report["aggregates"].as_array().map(Vec::len), Some(2));
}

#[test]
fn cli_rejects_bad_seeds() {
    let exe = env!("CARGO_BIN_EXE_emberfall-sim");
    let output = Command::new(exe)
        .args(["--seeds", "not-a-seed", "--report", "markdown"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid seed"));
}

#[test]
fn cli_markdown_report_to_stdout() {
    let exe = env!("CARGO_BIN_EXE_emberfall-sim");
    let output = Command::new(exe)
        .args([
            "--strategies",
            "tactician",
            "--battles",
            "2",
            "--report",
            "markdown",
        ])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# Emberfall Campaign Simulation"));
    assert!(stdout.contains("| Tactician |"));
}
