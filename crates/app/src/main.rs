//! deformlab - side-by-side ARAP deformation comparison, driven headlessly
//!
//! Builds the configured grid and backends, replays a scripted sequence of
//! mode, pointer and scroll events, and writes the deformed geometry of
//! every backend as a JSON report.

use clap::Parser;
use deformation::DeformationSession;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod input;
mod report;

use config::Args;
use error::AppError;
use input::{Script, ScriptRunner, demo_script};
use report::Report;

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    let config = args.harness_config()?;
    info!(
        "Starting deformlab with backends {:?}",
        config.backends.iter().map(|kind| kind.label()).collect::<Vec<_>>()
    );

    let mut session = DeformationSession::from_config(&config)?;
    let script = match &args.script {
        Some(path) => Script::load(path)?,
        None => {
            info!("No script given, running the built-in demo");
            demo_script(
                session.mesh(),
                config.grid.rows,
                config.grid.cols,
                &config.selection,
            )
        }
    };

    let mut runner = ScriptRunner::default();
    runner.run(&mut session, &script)?;

    let json = Report::from_session(&session, runner.ticks())
        .to_json()
        .map_err(AppError::Report)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).map_err(|source| AppError::Output {
                path: path.clone(),
                source,
            })?;
            info!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
