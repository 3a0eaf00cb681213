//! Drives a [`StageDag`] wave-by-wave, dispatching each wave's stages on
//! worker threads and collecting results through an `mpsc` channel
//! (spec.md §5: bounded-parallelism pipeline execution).

use crate::circuit_breaker::CircuitBreaker;
use crate::dag::StageDag;
use crate::error::StageError;
use crate::executor::{run_stage, StageResult, StageSpec};
use crate::failure::{retry_with_backoff, BackoffPolicy};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

pub struct PipelineConfig {
    pub registry_path: PathBuf,
    pub output_root: PathBuf,
    pub mode: String,
    pub max_parallel: usize,
    pub backoff: BackoffPolicy,
    pub circuit_failure_threshold: u32,
    pub circuit_cooldown: Duration,
    /// When a non-critical stage fails after exhausting retries, let its
    /// dependents still attempt to run instead of cascading them to skipped
    /// (spec.md §4.E).
    pub continue_on_non_critical_failure: bool,
}

pub struct PipelineOutcome {
    pub results: HashMap<String, StageResult>,
    pub failures: HashMap<String, StageError>,
    /// Stages never attempted because a critical (or non-continuable)
    /// ancestor failed (spec.md §4.E: "dependents cascade to skipped").
    pub skipped: HashSet<String>,
}

/// Runs every stage in `dag`, honoring per-stage circuit breakers across the
/// whole run. A stage failure cascades `skipped` to its full dependent
/// subtree unless the stage is flagged non-critical and the run allows
/// continuing past non-critical failures, in which case independent
/// branches (and dependents whose other inputs still succeeded) keep going
/// (spec.md §4.E).
pub fn run_pipeline(
    dag: &StageDag,
    specs: &HashMap<String, StageSpec>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome, StageError> {
    let batches = dag.parallel_batches()?;
    let breakers: Arc<Mutex<HashMap<String, CircuitBreaker>>> = Arc::new(Mutex::new(HashMap::new()));
    let mut results = HashMap::new();
    let mut failures = HashMap::new();
    let mut skipped: HashSet<String> = HashSet::new();

    for batch in batches {
        let to_run: Vec<String> = batch.into_iter().filter(|name| !skipped.contains(name)).collect();
        if to_run.is_empty() {
            continue;
        }

        let cap = config.max_parallel.max(1);
        for chunk in to_run.chunks(cap) {
            let (tx, rx) = mpsc::channel::<(String, Result<StageResult, StageError>)>();

            std::thread::scope(|scope| {
                for stage_name in chunk {
                    let spec = match specs.get(stage_name) {
                        Some(spec) => spec.clone(),
                        None => {
                            let _ = tx.send((
                                stage_name.clone(),
                                Err(StageError::SpawnFailed {
                                    stage: stage_name.clone(),
                                    executable: String::new(),
                                    reason: "no StageSpec registered".into(),
                                }),
                            ));
                            continue;
                        }
                    };
                    let registry_path = config.registry_path.clone();
                    let output_dir = config.output_root.join(&spec.name);
                    let mode = config.mode.clone();
                    let backoff = config.backoff;
                    let breakers = Arc::clone(&breakers);
                    let tx = tx.clone();
                    let stage_name = stage_name.clone();
                    let threshold = config.circuit_failure_threshold;
                    let cooldown = config.circuit_cooldown;

                    scope.spawn(move || {
                        let outcome = dispatch_with_circuit(
                            &spec,
                            &registry_path,
                            &output_dir,
                            &mode,
                            &backoff,
                            &breakers,
                            threshold,
                            cooldown,
                        );
                        let _ = tx.send((stage_name, outcome));
                    });
                }
            });
            drop(tx);

            for (stage_name, outcome) in rx {
                match outcome {
                    Ok(result) => {
                        info!(stage = %stage_name, duration_ms = %result.duration.as_millis(), "stage completed");
                        results.insert(stage_name, result);
                    }
                    Err(err) => {
                        warn!(stage = %stage_name, error = %err, "stage failed");
                        let critical = dag.node(&stage_name).map(|n| n.critical).unwrap_or(true);
                        let cascades = !(config.continue_on_non_critical_failure && !critical);
                        failures.insert(stage_name.clone(), err);
                        if cascades {
                            for dependent in dag.transitive_dependents(&stage_name) {
                                if !results.contains_key(&dependent) {
                                    skipped.insert(dependent);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(PipelineOutcome { results, failures, skipped })
}

#[allow(clippy::too_many_arguments)]
fn dispatch_with_circuit(
    spec: &StageSpec,
    registry_path: &Path,
    output_dir: &Path,
    mode: &str,
    backoff: &BackoffPolicy,
    breakers: &Arc<Mutex<HashMap<String, CircuitBreaker>>>,
    threshold: u32,
    cooldown: Duration,
) -> Result<StageResult, StageError> {
    {
        let mut guard = breakers.lock().expect("circuit breaker lock");
        let breaker = guard
            .entry(spec.name.clone())
            .or_insert_with(|| CircuitBreaker::new(threshold, cooldown));
        if !breaker.allow_request() {
            return Err(StageError::CircuitOpen {
                stage: spec.name.clone(),
            });
        }
    }

    let outcome = retry_with_backoff(backoff, || run_stage(spec, registry_path, output_dir, mode));

    let mut guard = breakers.lock().expect("circuit breaker lock");
    let breaker = guard.get_mut(&spec.name).expect("breaker was inserted above");
    match &outcome {
        Ok(_) => breaker.record_success(),
        Err(_) => breaker.record_failure(),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::StageNode;
    use std::os::unix::fs::PermissionsExt;

    /// Writes a standalone shell script that writes an empty-but-valid
    /// manifest.json into whatever `--output-dir` it's given and exits with
    /// `exit_code`, then returns its path.
    fn write_stage_script(dir: &std::path::Path, name: &str, exit_code: i32) -> PathBuf {
        let path = dir.join(name);
        let script = format!(
            "#!/bin/sh\n\
             out=\"\"\n\
             while [ $# -gt 0 ]; do\n\
             \tif [ \"$1\" = \"--output-dir\" ]; then out=\"$2\"; fi\n\
             \tshift\n\
             done\n\
             echo '{{\"stage_name\":\"{name}\",\"artifacts\":{{}}}}' > \"$out/manifest.json\"\n\
             exit {exit_code}\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn spec(dir: &std::path::Path, name: &str, exit_code: i32) -> StageSpec {
        StageSpec {
            name: name.to_string(),
            executable: write_stage_script(dir, name, exit_code).to_string_lossy().into_owned(),
            extra_args: vec![],
            timeout: Duration::from_secs(5),
        }
    }

    fn node(name: &str, deps: &[&str], critical: bool) -> StageNode {
        StageNode {
            name: name.to_string(),
            depends_on: deps.iter().map(|s| s.to_string()).collect(),
            output_subdir: name.to_string(),
            critical,
        }
    }

    fn base_config(dir: &std::path::Path, continue_on_non_critical_failure: bool) -> PipelineConfig {
        PipelineConfig {
            registry_path: dir.join("registry.json"),
            output_root: dir.join("artifacts"),
            mode: "standard".to_string(),
            max_parallel: 4,
            backoff: BackoffPolicy {
                base: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                max_attempts: 1,
            },
            circuit_failure_threshold: 100,
            circuit_cooldown: Duration::from_secs(60),
            continue_on_non_critical_failure,
        }
    }

    #[test]
    fn critical_failure_cascades_skips_to_every_dependent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("registry.json"), b"{}").unwrap();

        let mut dag = StageDag::new();
        dag.add_stage(node("match", &[], true));
        dag.add_stage(node("relationship", &["match"], true));
        dag.add_stage(node("validate", &["relationship"], true));

        let mut specs = HashMap::new();
        specs.insert("match".to_string(), spec(dir.path(), "match", 1));
        specs.insert("relationship".to_string(), spec(dir.path(), "relationship", 0));
        specs.insert("validate".to_string(), spec(dir.path(), "validate", 0));

        let config = base_config(dir.path(), true);
        let outcome = run_pipeline(&dag, &specs, &config).unwrap();

        assert!(outcome.failures.contains_key("match"));
        assert!(outcome.skipped.contains("relationship"));
        assert!(outcome.skipped.contains("validate"));
        assert!(outcome.results.is_empty());
    }

    #[test]
    fn non_critical_failure_does_not_cascade_when_continuing_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("registry.json"), b"{}").unwrap();

        let mut dag = StageDag::new();
        dag.add_stage(node("render_visual", &[], false));
        dag.add_stage(node("validate", &["render_visual"], true));

        let mut specs = HashMap::new();
        specs.insert("render_visual".to_string(), spec(dir.path(), "render_visual", 1));
        specs.insert("validate".to_string(), spec(dir.path(), "validate", 0));

        let config = base_config(dir.path(), true);
        let outcome = run_pipeline(&dag, &specs, &config).unwrap();

        assert!(outcome.failures.contains_key("render_visual"));
        assert!(outcome.skipped.is_empty());
        assert!(outcome.results.contains_key("validate"));
    }

    #[test]
    fn non_critical_failure_cascades_when_run_does_not_allow_continuing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("registry.json"), b"{}").unwrap();

        let mut dag = StageDag::new();
        dag.add_stage(node("match", &[], false));
        dag.add_stage(node("relationship", &["match"], true));

        let mut specs = HashMap::new();
        specs.insert("match".to_string(), spec(dir.path(), "match", 1));
        specs.insert("relationship".to_string(), spec(dir.path(), "relationship", 0));

        let config = base_config(dir.path(), false);
        let outcome = run_pipeline(&dag, &specs, &config).unwrap();

        assert!(outcome.failures.contains_key("match"));
        assert!(outcome.skipped.contains("relationship"));
    }
}
