use std::path::PathBuf;

use clap::Parser;
use log::{error, info, LevelFilter};

use reforest::{orchestrator, parse::Scenario, Objective, Problem, Report, SolverConfig};

/// Plans the purchase, planting and daily distribution of plants for a reforestation project
#[derive(Parser, Debug)]
#[clap(name = "reforest", version)]
struct Args {
    /// Path to the scenario file (JSON)
    scenario: PathBuf,
    /// Where to write the report. Printed to stdout if omitted.
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Time limit of every solve, in seconds
    #[clap(short, long)]
    time_limit: Option<f64>,
    /// Objective of the supply planning model
    #[clap(long, arg_enum, default_value = "cost")]
    objective: Objective,
    /// Solve the daily routing models concurrently
    #[clap(long)]
    parallel: bool,
    /// Let the solver log to the console
    #[clap(long)]
    solver_output: bool,
    /// Increase the log level (-v, -vv, -vvv)
    #[clap(short, parse(from_occurrences))]
    verbose: usize,
}

fn level(verbose: usize) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(args: &Args) -> reforest::Result<()> {
    let problem = Problem::try_from(Scenario::from_path(&args.scenario)?)?;
    let config = SolverConfig {
        time_limit: args.time_limit,
        objective: args.objective,
        parallel: args.parallel,
        solver_output: args.solver_output,
    };

    let outcome = orchestrator::run(&problem, &config)?;
    let report = Report::new(&problem, &outcome, config.objective);

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            serde_json::to_writer_pretty(std::io::BufWriter::new(file), &report)?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

pub fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(level(args.verbose))
        .parse_default_env()
        .init();

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
