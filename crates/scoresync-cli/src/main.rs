//! scoresync CLI - orchestrates MusicXML/MIDI/SVG identity propagation
//! across a staged pipeline.

mod cli_args;

use clap::Parser;
use std::process::ExitCode;

use cli_args::*;
use scoresync_cli::commands;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            score,
            performance,
            output_dir,
            config,
            t_window_ms,
            max_workers,
            cache,
            json,
        } => commands::run::run(
            &score,
            &performance,
            &output_dir,
            config.as_deref(),
            t_window_ms,
            max_workers,
            cache,
            json,
        ),
        Commands::Doctor { config } => commands::doctor::run(config.as_deref()),
        Commands::Inspect { registry, json } => commands::inspect::run(&registry, json),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
