//! Inspect command: prints a summary of a registry file without running a
//! full validation pass (SPEC_FULL.md §9.3).

use anyhow::Result;
use colored::Colorize;
use scoresync_validator::{validate, StageRequirements};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub fn run(registry_path: &Path, json: bool) -> Result<ExitCode> {
    let registry = scoresync_registry::load(registry_path)?;
    let requirements = StageRequirements::new(vec!["render_visual".into(), "render_audio".into()]);
    let artifact_root = registry_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("artifacts");
    let report = validate(&registry, &requirements, &artifact_root);

    if json {
        let payload = serde_json::json!({
            "entry_count": registry.len(),
            "tied_group_count": registry.tied_groups().len(),
            "ornament_group_count": registry.ornament_groups().len(),
            "confidence_histogram": report.confidence_histogram,
            "fallback_match_count": report.fallback_matches.len(),
            "integrity_error_count": report.integrity_errors.len(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", "scoresync registry summary".cyan().bold());
    println!("{}", "==========================".cyan());
    println!();
    println!("entries:           {}", registry.len());
    println!("tied groups:       {}", registry.tied_groups().len());
    println!("ornament groups:   {}", registry.ornament_groups().len());
    println!();
    println!("{}", "confidence histogram:".bold());
    for (tier, count) in &report.confidence_histogram {
        println!("  {tier:<10} {count}");
    }
    println!();
    if !report.fallback_matches.is_empty() {
        println!(
            "{} {} entries matched via fallback (pitch-only); review recommended",
            "!!".yellow(),
            report.fallback_matches.len()
        );
    }
    if report.integrity_errors.is_empty() {
        println!("{} registry is internally consistent", "ok".green());
    } else {
        println!(
            "{} {} integrity errors found",
            "!!".red(),
            report.integrity_errors.len()
        );
        for err in &report.integrity_errors {
            println!("  - {err}");
        }
    }

    Ok(ExitCode::SUCCESS)
}
