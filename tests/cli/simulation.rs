//! Simulation runs driven by parsed arguments

use clap::Parser;
use jobqueue::app::cli::args::Args;
use jobqueue::app::simulate::{run_simulation, SessionRole, SimulationPlan};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_simulation_from_arguments() {
    let args = Args::try_parse_from([
        "jobqueue",
        "--producers",
        "3",
        "--jobs",
        "7",
        "--sessions",
        "2",
        "--early-leavers",
        "1",
        "--leave-after",
        "4",
        "--observers",
        "1",
        "--queue-name",
        "integration",
    ])
    .unwrap();
    assert!(args.validate().is_ok());

    let report = run_simulation(SimulationPlan::from(&args)).await.unwrap();

    assert_eq!(report.queue, "integration");
    assert_eq!(report.jobs_pushed, 21);
    assert_eq!(report.completed + report.abandoned, 21);
    assert_eq!(report.sessions.len(), 3);
    assert!(report.final_stats.live_sessions == 0);

    let consumer = report
        .sessions
        .iter()
        .find(|s| s.role == SessionRole::Consumer)
        .unwrap();
    assert_eq!(consumer.pops, 21);
}

#[tokio::test]
async fn test_session_limit_surfaces_as_error() {
    let args = Args::try_parse_from(["jobqueue", "--sessions", "3", "--max-sessions", "2"]).unwrap();
    let result = run_simulation(SimulationPlan::from(&args)).await;
    assert!(result.is_err());
}
