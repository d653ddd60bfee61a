//! CLI Integration Tests
//!
//! These tests run the `tidelog` binary against a throwaway database.
//!
//! ```
//! cargo test --package tidelog-cli --test cli_integration
//! ```

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Get path to the tidelog binary
fn get_binary_path() -> &'static str {
    env!("CARGO_BIN_EXE_tidelog")
}

/// A temporary config + database pair.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = format!(
            "[storage]\npath = {:?}\n\n[identity]\ncaller = \"0xfarm\"\nwriters = [\"0xtech\"]\n",
            dir.path().join("data.db")
        );
        std::fs::write(dir.path().join("config.toml"), config).expect("Failed to write config");
        Self { dir }
    }

    fn config_path(&self) -> &Path {
        self.dir.path()
    }

    /// Run tidelog with this workspace's config and return output
    fn run(&self, args: &[&str]) -> Output {
        Command::new(get_binary_path())
            .arg("--config")
            .arg(self.config_path().join("config.toml"))
            .args(args)
            .env_remove("TIDELOG_CALLER")
            .env_remove("TIDELOG_DATABASE")
            .env_remove("TIDELOG_CONFIG")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run tidelog binary")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "tidelog {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }
}

/// 2022-01-08 08:20:00 UTC (day 19000, minute 500)
const AT_MINUTE_500: &str = "1641630000000";

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_command() {
    let output = Command::new(get_binary_path())
        .arg("--help")
        .output()
        .expect("Failed to run tidelog binary");

    assert!(output.status.success(), "Help should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["create", "submit", "get", "latest", "filled", "export", "feed"] {
        assert!(stdout.contains(command), "Help should list {} command", command);
    }
}

#[test]
fn test_version_command() {
    let output = Command::new(get_binary_path())
        .arg("--version")
        .output()
        .expect("Failed to run tidelog binary");

    assert!(output.status.success(), "Version should succeed");
    assert!(String::from_utf8_lossy(&output.stdout).contains("tidelog"));
}

// =============================================================================
// Store Round Trips
// =============================================================================

#[test]
fn test_create_submit_query() {
    let ws = Workspace::new();

    let id = ws.run_ok(&["create", "--name", "pond-3"]);
    assert_eq!(id.trim(), "1");

    let submit = [
        "submit",
        "--device",
        "1",
        "--temperature",
        "27.53",
        "--ph",
        "7.2",
        "--oxygen",
        "6.8",
        "--salinity",
        "35",
        "--at",
        AT_MINUTE_500,
    ];
    let out = ws.run_ok(&submit);
    assert!(out.contains("day 19000 minute 500"), "unexpected: {}", out);

    let get = ws.run_ok(&["get", "--device", "1", "--day", "19000", "--minute", "500", "--json"]);
    let value: serde_json::Value = serde_json::from_str(&get).unwrap();
    assert_eq!(value["temperature_x100"], 2753);
    assert_eq!(value["ph_x100"], 720);

    // Same minute again converges on the last value
    let mut resubmit = submit;
    resubmit[4] = "28";
    ws.run_ok(&resubmit);

    let filled = ws.run_ok(&["filled", "--device", "1", "--day", "19000", "--json"]);
    let value: serde_json::Value = serde_json::from_str(&filled).unwrap();
    assert_eq!(value["filled"], 1);

    let latest = ws.run_ok(&["latest", "--device", "1"]);
    assert!(latest.contains("temperature 28.00"), "unexpected: {}", latest);

    let info = ws.run_ok(&["info", "--device", "1"]);
    assert!(info.contains("Owner:     0xfarm"));
    assert!(info.contains("Last day:  19000 (2022-01-08)"));
}

#[test]
fn test_export_csv() {
    let ws = Workspace::new();
    ws.run_ok(&["create", "--name", "pond-3"]);
    ws.run_ok(&[
        "submit", "-d", "1", "-t", "27.53", "-p", "7.2", "-o", "6.8", "-s", "35", "--at",
        AT_MINUTE_500,
    ]);

    let csv = ws.run_ok(&["export", "--device", "1", "--day", "19000"]);
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(
        lines,
        [
            "minute_index,timestamp,temperature,ph,dissolved_oxygen,salinity",
            "500,2022-01-08T08:20:00Z,27.53,7.20,6.80,35.00",
        ]
    );
}

#[test]
fn test_export_rejects_json() {
    let ws = Workspace::new();
    ws.run_ok(&["create", "--name", "pond-3"]);

    let output = ws.run(&["export", "--device", "1", "--day", "2022-01-08", "--json"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("always writes CSV"));
}

#[test]
fn test_backfill_before_last_day_is_rejected() {
    let ws = Workspace::new();
    ws.run_ok(&["create", "--name", "pond-3"]);

    let submit = |at: &'static str| {
        [
            "submit", "-d", "1", "-t", "20", "-p", "7", "-o", "6", "-s", "30", "--at", at,
        ]
    };

    // 2022-01-10 23:59 UTC, then 2021-12-29 00:00 UTC
    ws.run_ok(&submit("1641859140000"));
    let output = ws.run(&submit("1640736000000"));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("before day 19002"));

    let info = ws.run_ok(&["info", "--device", "1", "--json"]);
    let value: serde_json::Value = serde_json::from_str(&info).unwrap();
    assert_eq!(value["first_day_utc"], 19002);
    assert_eq!(value["last_day_utc"], 19002);
    assert_eq!(value["bucket_count"], 1);
}

#[test]
fn test_writers_and_unauthorized_callers() {
    let ws = Workspace::new();
    ws.run_ok(&["create", "--name", "pond-3"]);

    let args = |caller: &'static str| {
        [
            "submit", "-d", "1", "-t", "20", "-p", "7", "-o", "6", "-s", "30", "--at",
            AT_MINUTE_500, "--caller", caller,
        ]
    };

    ws.run_ok(&args("0xtech"));

    let output = ws.run(&args("0xstranger"));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unauthorized"));

    let feed = ws.run_ok(&["feed", "--json"]);
    let value: serde_json::Value = serde_json::from_str(&feed).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 1);
    assert_eq!(value[0]["caller"], "0xtech");
}

#[test]
fn test_invalid_input_is_rejected() {
    let ws = Workspace::new();
    ws.run_ok(&["create", "--name", "pond-3"]);

    let output = ws.run(&["get", "-d", "1", "--day", "19000", "-m", "1440"]);
    assert!(output.status.success(), "absent day is not an error");
    assert!(String::from_utf8_lossy(&output.stdout).contains("No reading"));

    let output = ws.run(&[
        "submit", "-d", "1", "-t", "27.531", "-p", "7", "-o", "6", "-s", "30",
    ]);
    assert!(!output.status.success(), "three decimals should be rejected");

    let output = ws.run(&["latest", "-d", "42"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Device not found"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[identity]\ncaller = \"\"\n").unwrap();

    let output = Command::new(get_binary_path())
        .arg("--config")
        .arg(&path)
        .arg("list")
        .output()
        .expect("Failed to run tidelog binary");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("identity.caller"));
}
