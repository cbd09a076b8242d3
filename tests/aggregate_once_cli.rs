// tests/aggregate_once_cli.rs
// The one-shot binary honours RUST_LOG / LOG_FORMAT and keeps logs off stdout.
use std::fs;
use std::process::Command;

#[test]
fn json_logs_on_stderr_report_on_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("aggregator.toml");
    // empty inline feed list: no network, one warning
    fs::write(&cfg, "feeds = []\nkeywords = []\nblacklist = []\n").unwrap();

    let out = Command::new(env!("CARGO_BIN_EXE_aggregate_once"))
        .current_dir(dir.path())
        .env("NEWS_CONFIG_PATH", &cfg)
        .env("RUST_LOG", "info")
        .env("LOG_FORMAT", "json")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stderr = String::from_utf8_lossy(&out.stderr);
    let warn_line = stderr
        .lines()
        .find(|l| l.contains("no active feeds configured"))
        .unwrap_or_else(|| panic!("missing warning in: {stderr}"));
    let parsed: serde_json::Value = serde_json::from_str(warn_line).unwrap();
    assert_eq!(parsed["level"], "WARN");

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(!stdout.contains("no active feeds configured"));
}
