use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "pharaoh-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_pharaoh-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("last-second"));
}

#[test]
fn cli_runs_smoke_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_pharaoh-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "smoke,idle-timeout",
            "--iterations",
            "1",
            "--seeds",
            "1,2",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Pharaoh's Tomb Automated Tester"));
    let report = std::fs::read_to_string(output_path).expect("read report");
    let value: serde_json::Value = serde_json::from_str(&report).expect("json report");
    assert_eq!(value.as_array().map(Vec::len), Some(4));
    assert!(value.as_array().unwrap().iter().all(|r| r["passed"] == true));
}

#[test]
fn cli_persists_hall_of_fame_between_runs() {
    let exe = env!("CARGO_BIN_EXE_pharaoh-tester");
    let board_dir = temp_path("board");
    for _ in 0..2 {
        let status = Command::new(exe)
            .args(["--scenarios", "smoke", "--iterations", "1", "--leaderboard-dir"])
            .arg(&board_dir)
            .status()
            .expect("run cli");
        assert!(status.success());
    }
    let raw = std::fs::read_to_string(board_dir.join("pharaoh-leaderboard.json"))
        .expect("leaderboard written");
    let entries: serde_json::Value = serde_json::from_str(&raw).expect("leaderboard json");
    assert_eq!(entries.as_array().map(Vec::len), Some(2));
    let _ = std::fs::remove_dir_all(board_dir);
}

#[test]
fn cli_rejects_bad_seeds() {
    let exe = env!("CARGO_BIN_EXE_pharaoh-tester");
    let output = Command::new(exe)
        .args(["--seeds", "scarab"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
}
