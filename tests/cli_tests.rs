//! Integration tests for the jobhours binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

const PROXY_VARS: &[&str] = &[
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
];

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("search_response.json")
}

/// Write a config file so tests never read the user's own config
fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, format!("timezone = \"utc\"\n{}", extra)).unwrap();
    path
}

fn jobhours(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("jobhours").unwrap();
    cmd.env_remove("RUST_LOG").arg("--config").arg(config);
    for var in PROXY_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Serve one HTTP response and hand back the request body it received.
fn one_shot_server(status_line: &'static str, body: String) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
        }
        let mut request_body = vec![0u8; content_length];
        reader.read_exact(&mut request_body).unwrap();

        let mut stream = stream;
        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();

        String::from_utf8(request_body).unwrap()
    });

    (format!("http://{}", addr), handle)
}

#[test]
fn test_help_lists_subcommands() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "");

    jobhours(&config)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("report"))
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("summarize"));
}

#[test]
fn test_query_prints_request_body() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "");

    let output = jobhours(&config)
        .args(["query", "--start", "2024-01-01", "--end", "2024-01-04", "--interval", "12h"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["size"], 0);
    assert_eq!(
        body["query"]["bool"]["filter"][0]["range"]["EndTime"]["gte"],
        1_704_067_200_000i64
    );
    assert_eq!(body["query"]["bool"]["filter"][1]["term"]["ResourceType"], "Batch");
    assert_eq!(body["aggs"]["EndTime"]["date_histogram"]["interval"], "12h");
}

#[test]
fn test_query_uses_config_fields() {
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        "time_field = \"StartTime\"\njobs_field = \"Count\"\nfilters = []\n",
    );

    let output = jobhours(&config)
        .args(["query", "--start", "2024-01-01", "--end", "2024-01-02"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["query"]["bool"]["filter"].as_array().unwrap().len(), 1);
    assert_eq!(body["aggs"]["StartTime"]["aggs"]["Count"]["sum"]["field"], "Count");
}

#[test]
fn test_query_rejects_inverted_window() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "");

    jobhours(&config)
        .args(["query", "--start", "2024-02-01", "--end", "2024-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid window"));
}

#[test]
fn test_summarize_prints_headline() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "");

    jobhours(&config)
        .arg("summarize")
        .arg(fixture())
        .args(["--start", "2024-01-01", "--end", "2024-01-04"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "292458 jobs, 99214.00 CPU hours over 3 buckets",
        ))
        .stdout(predicate::str::contains("peak:").not())
        .stdout(predicate::str::contains("wrote").not());
}

#[test]
fn test_summarize_infers_window_from_buckets() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "days = 30\n");

    let output = jobhours(&config)
        .arg("summarize")
        .arg(fixture())
        .arg("--json")
        .output()
        .unwrap();

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["start"], "2024-01-01T00:00:00Z");
    assert_eq!(summary["end"], "2024-01-04T00:00:00Z");
}

#[test]
fn test_summarize_single_bucket_needs_dates() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "");
    let raw = temp.path().join("raw.json");
    fs::write(
        &raw,
        r#"{"aggregations":{"EndTime":{"buckets":[{"key":1704067200000,"Njobs":{"value":1}}]}}}"#,
    )
    .unwrap();

    jobhours(&config)
        .arg("summarize")
        .arg(&raw)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--start and --end"));

    jobhours(&config)
        .arg("summarize")
        .arg(&raw)
        .args(["--start", "2024-01-01", "--end", "2024-01-02"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 jobs"));
}

#[test]
fn test_summarize_json_and_output_dir() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "summary_file = \"week.json\"\n");
    let out = temp.path().join("out");

    let output = jobhours(&config)
        .arg("summarize")
        .arg(fixture())
        .args(["--start", "2024-01-01", "--end", "2024-01-04", "--json", "--csv", "-o"])
        .arg(&out)
        .output()
        .unwrap();

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["bucket_count"], 3);
    assert_eq!(summary["points"][0]["date"], "2024-01-01");

    assert!(out.join("week.json").exists());
    assert!(out.join("timeseries.csv").exists());
    assert!(!out.join("raw_response.json").exists());
}

#[test]
fn test_summarize_rejects_wrong_shape() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "");
    let raw = temp.path().join("raw.json");
    fs::write(&raw, r#"{"aggregations":{"EndTime":{"buckets":"nope"}}}"#).unwrap();

    jobhours(&config)
        .arg("summarize")
        .arg(&raw)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not an array"));
}

#[test]
fn test_report_end_to_end() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let config = write_config(temp.path(), "index = \"jobs\"\n");
    let (endpoint, handle) =
        one_shot_server("HTTP/1.1 200 OK", fs::read_to_string(fixture()).unwrap());

    jobhours(&config)
        .args(["report", "--start", "2024-01-01", "--end", "2024-01-04", "--endpoint"])
        .arg(&endpoint)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("292458 jobs"));

    let sent: serde_json::Value = serde_json::from_str(&handle.join().unwrap()).unwrap();
    assert_eq!(sent["size"], 0);

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("raw_response.json")).unwrap()).unwrap();
    assert_eq!(raw["took"], 41);
    assert!(out.join("summary.json").exists());
}

#[test]
fn test_report_non_ok_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let config = write_config(temp.path(), "");
    let (endpoint, handle) = one_shot_server(
        "HTTP/1.1 503 Service Unavailable",
        r#"{"error":"unavailable"}"#.to_string(),
    );

    jobhours(&config)
        .args(["report", "--start", "2024-01-01", "--end", "2024-01-04", "--endpoint"])
        .arg(&endpoint)
        .arg("-o")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("search request"));

    handle.join().unwrap();
    assert!(!out.exists());
}

#[test]
fn test_missing_config_file_fails() {
    let temp = TempDir::new().unwrap();

    jobhours(&temp.path().join("absent.toml"))
        .arg("query")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config error"));
}
