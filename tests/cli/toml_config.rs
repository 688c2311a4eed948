//! CLI TOML configuration tests
//!
//! Tests for configuration file discovery, parsing and CLI overrides.

use clap::Parser;
use jobqueue::app::cli::args::Args;
use jobqueue::app::cli::config::ConfigError;
use std::io::Write;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_full_config_file() {
    let file = write_config(
        r#"
log-level = "debug"
log-format = "json"
format = "json"
color = false

[queue]
name = "nightly"
max-jobs = 500
max-sessions = 10
max-pending-requests = 32

[simulation]
producers = 3
jobs = 40
sessions = 4
early-leavers = 2
leave-after = 6
observers = 1
"#,
    );

    let mut args = Args::try_parse_from(["jobqueue"]).unwrap();
    let raw = Args::parse_config_file(&mut args, Some(file.path().to_path_buf()))
        .await
        .unwrap()
        .unwrap();

    assert!(raw.contains_key("queue"));
    assert_eq!(args.log_level.as_deref(), Some("debug"));
    assert_eq!(args.log_format.as_deref(), Some("json"));
    assert!(args.json_report());
    assert!(!args.use_color(true));

    let queue = args.queue_config();
    assert_eq!(queue.name, "nightly");
    assert_eq!(queue.max_jobs, Some(500));
    assert_eq!(queue.max_sessions, Some(10));
    assert_eq!(queue.max_pending_requests, Some(32));

    assert_eq!(args.producers(), 3);
    assert_eq!(args.jobs_per_producer(), 40);
    assert_eq!(args.sessions(), 4);
    assert_eq!(args.early_leavers(), 2);
    assert_eq!(args.leave_after(), 6);
    assert_eq!(args.observers(), 1);
    assert!(args.validate().is_ok());
}

#[tokio::test]
async fn test_cli_overrides_config_file() {
    let file = write_config(
        r#"
log-level = "trace"
[queue]
name = "from-file"
[simulation]
sessions = 9
"#,
    );

    let mut args = Args::try_parse_from([
        "jobqueue",
        "--log-level",
        "error",
        "--queue-name",
        "from-cli",
        "--sessions",
        "2",
    ])
    .unwrap();
    Args::parse_config_file(&mut args, Some(file.path().to_path_buf()))
        .await
        .unwrap();

    assert_eq!(args.log_level.as_deref(), Some("error"));
    assert_eq!(args.queue_config().name, "from-cli");
    assert_eq!(args.sessions(), 2);
}

#[tokio::test]
async fn test_malformed_config_file() {
    let file = write_config("producers = [1, 2\n");
    let mut args = Args::default();
    let result = Args::parse_config_file(&mut args, Some(file.path().to_path_buf())).await;
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[tokio::test]
async fn test_wrong_value_types() {
    let file = write_config("[simulation]\njobs = \"ten\"\n");
    let mut args = Args::default();
    let err = Args::parse_config_file(&mut args, Some(file.path().to_path_buf()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("jobs"));
}
