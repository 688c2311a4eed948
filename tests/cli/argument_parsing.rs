//! CLI argument parsing tests

use clap::Parser;
use jobqueue::app::cli::args::*;

#[test]
fn test_version_flag_is_handled_by_clap() {
    let result = Args::try_parse_from(["jobqueue", "--version"]);
    let err = result.unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    assert!(err.to_string().contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_short_and_long_forms_agree() {
    let short = Args::try_parse_from(["jobqueue", "-p", "2", "-j", "8", "-s", "3", "-e", "1", "-b", "2"])
        .unwrap();
    let long = Args::try_parse_from([
        "jobqueue",
        "--producers",
        "2",
        "--jobs",
        "8",
        "--sessions",
        "3",
        "--early-leavers",
        "1",
        "--observers",
        "2",
    ])
    .unwrap();

    assert_eq!(short.producers(), long.producers());
    assert_eq!(short.jobs_per_producer(), long.jobs_per_producer());
    assert_eq!(short.sessions(), long.sessions());
    assert_eq!(short.early_leavers(), long.early_leavers());
    assert_eq!(short.observers(), long.observers());
}

#[test]
fn test_counts_must_be_numbers() {
    assert!(Args::try_parse_from(["jobqueue", "--jobs", "many"]).is_err());
    assert!(Args::try_parse_from(["jobqueue", "--sessions", "-1"]).is_err());
}
