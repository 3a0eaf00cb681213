//! Doctor command: checks declared stage executables are present and the
//! workspace is writable (SPEC_FULL.md §9.1, grounded on the teacher's
//! `commands/doctor.rs`).

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;

const DECLARED_STAGES: [&str; 2] = ["scoresync-render-visual", "scoresync-render-audio"];

pub fn run(config_path: Option<&Path>) -> Result<ExitCode> {
    println!("{}", "scoresync Doctor".cyan().bold());
    println!("{}", "================".cyan());
    println!();

    let mut all_ok = true;

    println!("{}", "Versions:".bold());
    println!("  {} scoresync-cli v{}", "->".green(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("{}", "Stage executables:".bold());
    for stage in DECLARED_STAGES {
        match which::which(stage) {
            Ok(path) => println!("  {} {} ({})", "ok".green(), stage, path.display()),
            Err(_) => {
                println!("  {} {} not found on PATH", "!!".yellow(), stage);
                println!(
                    "     {}",
                    "required to run the render_visual/render_audio stages".dimmed()
                );
            }
        }
    }
    println!();

    println!("{}", "Config:".bold());
    match config_path {
        Some(path) if path.exists() => {
            println!("  {} {} found", "ok".green(), path.display());
        }
        Some(path) => {
            println!("  {} {} not found; using built-in defaults", "!!".yellow(), path.display());
        }
        None => println!("  {} no config path given; using built-in defaults", "--".dimmed()),
    }
    println!();

    println!("{}", "Permissions:".bold());
    match std::env::current_dir() {
        Ok(dir) => {
            let probe = dir.join(".scoresync_write_probe");
            match std::fs::write(&probe, b"probe") {
                Ok(_) => {
                    let _ = std::fs::remove_file(&probe);
                    println!("  {} current directory is writable ({})", "ok".green(), dir.display());
                }
                Err(err) => {
                    println!("  {} cannot write to current directory: {err}", "!!".red());
                    all_ok = false;
                }
            }
        }
        Err(err) => {
            println!("  {} cannot determine current directory: {err}", "!!".red());
            all_ok = false;
        }
    }
    println!();

    if all_ok {
        println!("{} all checks passed", "SUCCESS".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{} some checks failed; see above", "WARNING".yellow().bold());
        Ok(ExitCode::from(1))
    }
}
