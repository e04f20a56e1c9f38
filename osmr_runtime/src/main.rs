use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use osmr_engine::domain::SimulationOptions;
use osmr_engine::program::Program;
use osmr_runtime::drift::{check_scenario, verify_determinism};
use osmr_runtime::record::{save_recorded, RecordedTrace};
use osmr_runtime::replay::rebuild_trace_with;
use osmr_runtime::scenario::{load_all, load_program};
use osmr_runtime::Result;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Predict overload and special-member resolution traces",
    long_about = None
)]
struct Cli {
    /// Materialise temporaries instead of constructing them in place.
    #[arg(long, global = true)]
    no_elide: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run scenario files or directories and report PASS/FAIL")]
    Check {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    #[command(about = "Print the predicted trace of a program or scenario")]
    Trace {
        file: PathBuf,
        /// Also print the canonical digest.
        #[arg(long)]
        hash: bool,
    },
    #[command(about = "Record the trace of a program or scenario with its digest")]
    Record { file: PathBuf, out: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// `Ok(false)` when a scenario failed.
fn run(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Commands::Check { paths } => {
            let override_options = cli.no_elide.then(no_elide);
            let scenarios = load_all(paths)?;
            let mut failed = 0usize;
            for (path, scenario) in &scenarios {
                let verdict = check_scenario(scenario, override_options.as_ref());
                if verdict.passed() {
                    println!("PASS {} ({})", scenario.name, verdict);
                } else {
                    failed += 1;
                    println!("FAIL {} [{}]", scenario.name, path.display());
                    for line in verdict.to_string().lines() {
                        println!("    {}", line);
                    }
                }
            }
            println!("{} passed, {} failed", scenarios.len() - failed, failed);
            Ok(failed == 0)
        }
        Commands::Trace { file, hash } => {
            let (name, program) = load_program(file)?;
            let (trace, digest) = rebuild_trace_with(&program, options_for(cli, &program))?;
            info!(program = %name, events = trace.events.len(), "trace rebuilt");
            for line in trace.lines() {
                println!("{}", line);
            }
            if *hash {
                println!("sha256 {}", digest);
            }
            Ok(true)
        }
        Commands::Record { file, out } => {
            let (name, mut program) = load_program(file)?;
            program.options = options_for(cli, &program);
            verify_determinism(&program)?;
            let (trace, _) = rebuild_trace_with(&program, program.options.clone())?;
            let record = RecordedTrace::new(name, trace);
            save_recorded(out, &record)?;
            println!(
                "recorded {} events to {} (sha256 {})",
                record.events.events.len(),
                out.display(),
                record.hash
            );
            Ok(true)
        }
    }
}

fn no_elide() -> SimulationOptions {
    SimulationOptions {
        guaranteed_elision: false,
    }
}

fn options_for(cli: &Cli, program: &Program) -> SimulationOptions {
    if cli.no_elide {
        no_elide()
    } else {
        program.options.clone()
    }
}
