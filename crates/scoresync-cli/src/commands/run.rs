//! Run command: executes the full pipeline and reports the final summary
//! line plus exit code (spec.md §7).

use crate::config::RunConfig;
use crate::pipeline::{self, RunPaths};
use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

#[allow(clippy::too_many_arguments)]
pub fn run(
    score: &Path,
    performance: &Path,
    output_dir: &Path,
    config_path: Option<&Path>,
    t_window_ms: Option<f64>,
    max_workers: Option<usize>,
    cache: bool,
    json: bool,
) -> Result<ExitCode> {
    let project_dir = config_path
        .and_then(|p| p.parent())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut config = RunConfig::load_layered(&project_dir)?;
    if let Some(v) = t_window_ms {
        config.t_window_ms = v;
    }
    if let Some(v) = max_workers {
        config.max_workers = v;
    }

    let paths = RunPaths {
        output_dir: output_dir.to_path_buf(),
    };

    let start = Instant::now();
    let summary = pipeline::run_with_cache(score, performance, &paths, &config, cache)?;
    let wall_time = start.elapsed();

    if json {
        let payload = serde_json::json!({
            "matched": summary.matched,
            "unmatched": summary.unmatched,
            "tied_groups": summary.tied_groups,
            "ornament_groups": summary.ornament_groups,
            "stages_succeeded": summary.stages_succeeded,
            "stages_failed": summary.stages_failed,
            "stages_skipped": summary.stages_skipped,
            "integrity_errors": summary.validation.integrity_errors.len(),
            "fallback_matches": summary.validation.fallback_matches.len(),
            "wall_time_secs": wall_time.as_secs_f64(),
            "success": summary.validation.is_successful(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "matched={} unmatched={} tied_groups={} ornament_groups={} stages_ok={} stages_failed={} stages_skipped={} wall_time={:.2}s",
            summary.matched,
            summary.unmatched,
            summary.tied_groups,
            summary.ornament_groups,
            summary.stages_succeeded,
            summary.stages_failed,
            summary.stages_skipped,
            wall_time.as_secs_f64(),
        );
        if summary.validation.is_successful() {
            println!("{} run completed with zero integrity errors", "SUCCESS".green().bold());
        } else {
            println!(
                "{} {} integrity errors found",
                "FAILURE".red().bold(),
                summary.validation.integrity_errors.len()
            );
            for err in &summary.validation.integrity_errors {
                println!("  - {err}");
            }
        }
    }

    if summary.validation.is_successful() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}
