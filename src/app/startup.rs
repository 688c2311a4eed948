use crate::app::cli::args::Args;
use crate::app::simulate::{run_simulation, SimulationPlan};
use crate::core::logging::init_logging;
use crate::core::version::long_version;
use clap::Parser;
use std::io::IsTerminal;

/// Initialize application startup
pub fn startup() {
    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let exit_code = runtime.block_on(run(args));
    std::process::exit(exit_code);
}

async fn run(mut args: Args) -> i32 {
    // Stage 1: configuration file, filling whatever the command line left unset
    let config_file = args.config_file.clone();
    if let Err(e) = Args::parse_config_file(&mut args, config_file).await {
        eprintln!("Error: {}", e);
        return 1;
    }

    // Stage 2: logging and color, now that every source has been merged
    let use_color = args.use_color(std::io::stdout().is_terminal());
    colored::control::set_override(use_color);
    let log_file = args.log_file_path();
    if let Err(e) = init_logging(
        args.log_level.as_deref(),
        args.log_format.as_deref(),
        log_file.as_deref(),
        use_color,
    ) {
        eprintln!("Error initialising logging: {}", e);
        return 1;
    }

    log::info!("jobqueue {} starting", long_version());
    log::debug!("Final arguments: {:#?}", args);

    if let Err(e) = args.validate() {
        log::error!("{}", e);
        return 1;
    }

    // Stage 3: run and report
    let report = match run_simulation(SimulationPlan::from(&args)).await {
        Ok(report) => report,
        Err(e) => {
            log::error!("Simulation failed: {}", e);
            return 1;
        }
    };

    if args.json_report() {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                log::error!("{}", e);
                return 1;
            }
        }
    } else {
        println!("{}", report.render_table(use_color));
    }

    if report.abandoned > 0 {
        log::warn!(
            "{} of {} jobs were abandoned",
            report.abandoned,
            report.jobs_pushed
        );
    }
    0
}
