//! Reference stage executor.
//!
//! Demonstrates the minimal CLI contract a stage executor must honor
//! (spec.md §6.1): a positional registry path, `--output-dir`, and an
//! optional `--mode`. This executor plays the role of a rendering stage
//! (e.g. "render one marker file per matched note") without doing any
//! real audio/visual synthesis — it exists so integration tests and
//! operators have a conforming, inspectable example of the contract.
//!
//! # Usage
//!
//! ```bash
//! simple-subprocess-extension registry.json --output-dir ./artifacts --mode fast
//! ```

use clap::{Parser, ValueEnum};
use scoresync_model::manifest::{ArtifactRecord, Manifest};
use scoresync_registry::Registry;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

const STAGE_NAME: &str = "reference-marker";

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    Fast,
    Standard,
}

#[derive(Parser, Debug)]
#[command(name = "simple-subprocess-extension")]
#[command(about = "Reference scoresync stage executor")]
struct Args {
    /// Path to the current registry.json (spec.md §6.2).
    registry: PathBuf,

    /// Where to place declared artifacts.
    #[arg(long = "output-dir")]
    output_dir: PathBuf,

    /// Quality/speed trade-off; this reference executor ignores it beyond
    /// logging, since it produces placeholder markers rather than real media.
    #[arg(long, value_enum, default_value_t = Mode::Standard)]
    mode: Mode,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("[reference-marker] error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    eprintln!("[reference-marker] mode={:?}", args.mode);

    let registry_bytes =
        fs::read(&args.registry).map_err(|e| format!("reading {}: {e}", args.registry.display()))?;
    let registry: Registry =
        serde_json::from_slice(&registry_bytes).map_err(|e| format!("parsing registry: {e}"))?;

    fs::create_dir_all(&args.output_dir)
        .map_err(|e| format!("creating {}: {e}", args.output_dir.display()))?;

    let mut manifest = Manifest::new(STAGE_NAME);

    for (sequence, entry) in registry.entries().enumerate() {
        let Some(event) = &entry.performance_event else {
            // Tied/ornament member entries share their group's event; this
            // reference executor only marks entries that own one directly.
            continue;
        };

        let instrument = event.instrument.as_deref().unwrap_or("unknown");
        let velocity_tag = velocity_tag(event.velocity);
        let filename = format!(
            "{:03}_{}_{}_{}_{}.marker",
            sequence,
            instrument,
            event.midi_pitch,
            velocity_tag,
            entry.universal_id.prefix4(),
        );
        let path = args.output_dir.join(&filename);

        let contents = format!(
            "universal_id={}\nkind={:?}\nmatch_method={:?}\nconfidence={}\n",
            entry.universal_id, entry.kind, entry.match_method, entry.match_confidence
        );
        fs::write(&path, &contents).map_err(|e| format!("writing {}: {e}", path.display()))?;

        manifest.record(
            entry.universal_id,
            ArtifactRecord {
                path: PathBuf::from(&filename),
                content_hash: blake3::hash(contents.as_bytes()).to_hex().to_string(),
                byte_size: contents.len() as u64,
            },
        );
    }

    let manifest_path = args.output_dir.join("manifest.json");
    let manifest_json =
        serde_json::to_string_pretty(&manifest).map_err(|e| format!("encoding manifest: {e}"))?;
    fs::write(&manifest_path, manifest_json)
        .map_err(|e| format!("writing {}: {e}", manifest_path.display()))?;

    eprintln!(
        "[reference-marker] wrote {} artifact(s) for {} id(s)",
        manifest.total_artifact_count(),
        manifest.artifacts.len()
    );
    Ok(())
}

/// Coarse dynamics tag used in artifact filenames (spec.md §6.3).
fn velocity_tag(velocity: u8) -> &'static str {
    match velocity {
        0..=31 => "pp",
        32..=63 => "p",
        64..=95 => "mf",
        96..=111 => "f",
        112..=127 => "ff",
    }
}
