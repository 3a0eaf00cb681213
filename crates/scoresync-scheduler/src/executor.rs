//! Spawns a stage subprocess, enforces its timeout, and validates the
//! `manifest.json` it writes back (spec.md §4.F, §6.1).

use crate::error::StageError;
use scoresync_model::manifest::Manifest;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

/// One stage's executable contract: how to invoke it and how long to wait.
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub name: String,
    pub executable: String,
    /// Extra arguments, appended after the standard `--registry`/`--output-dir`/`--mode` flags.
    pub extra_args: Vec<String>,
    pub timeout: Duration,
}

/// The validated result of one successful stage run.
#[derive(Debug)]
pub struct StageResult {
    pub manifest: Manifest,
    pub duration: Duration,
    pub stderr: String,
}

/// Runs `spec` against `registry_path`, writing into `output_dir`, in `mode`
/// (spec.md §6.1: `--registry`, `--output-dir`, `--mode`).
pub fn run_stage(
    spec: &StageSpec,
    registry_path: &Path,
    output_dir: &Path,
    mode: &str,
) -> Result<StageResult, StageError> {
    std::fs::create_dir_all(output_dir)?;

    let mut cmd = Command::new(&spec.executable);
    cmd.arg("--registry")
        .arg(registry_path)
        .arg("--output-dir")
        .arg(output_dir)
        .arg("--mode")
        .arg(mode);
    for arg in &spec.extra_args {
        cmd.arg(arg);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let start = Instant::now();
    let child = cmd.spawn().map_err(|err| StageError::SpawnFailed {
        stage: spec.name.clone(),
        executable: spec.executable.clone(),
        reason: err.to_string(),
    })?;

    let output = wait_with_timeout(&spec.name, child, spec.timeout)?;
    let duration = start.elapsed();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(StageError::NonZeroExit {
            stage: spec.name.clone(),
            code: output.status.code().unwrap_or(-1),
            stderr,
        });
    }

    let manifest = load_and_verify_manifest(&spec.name, output_dir)?;

    Ok(StageResult {
        manifest,
        duration,
        stderr,
    })
}

fn wait_with_timeout(
    stage_name: &str,
    mut child: std::process::Child,
    timeout: Duration,
) -> Result<Output, StageError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stdout = read_all(child.stdout.take());
                let stderr = read_all(child.stderr.take());
                return Ok(Output {
                    status,
                    stdout,
                    stderr,
                });
            }
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(StageError::Timeout {
                        stage: stage_name.to_string(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                return Err(StageError::SpawnFailed {
                    stage: stage_name.to_string(),
                    executable: String::new(),
                    reason: format!("failed to poll process: {err}"),
                });
            }
        }
    }
}

fn read_all(stream: Option<impl std::io::Read>) -> Vec<u8> {
    stream
        .map(|mut s| {
            let mut buf = Vec::new();
            let _ = std::io::Read::read_to_end(&mut s, &mut buf);
            buf
        })
        .unwrap_or_default()
}

fn load_and_verify_manifest(stage_name: &str, output_dir: &Path) -> Result<Manifest, StageError> {
    let manifest_path: PathBuf = output_dir.join("manifest.json");
    if !manifest_path.exists() {
        return Err(StageError::ManifestMissing {
            stage: stage_name.to_string(),
        });
    }
    let bytes = std::fs::read(&manifest_path)?;
    let manifest: Manifest =
        serde_json::from_slice(&bytes).map_err(|err| StageError::ManifestInvalid {
            stage: stage_name.to_string(),
            reason: err.to_string(),
        })?;

    for artifacts in manifest.artifacts.values() {
        for artifact in artifacts {
            let full_path = output_dir.join(&artifact.path);
            if !full_path.exists() {
                return Err(StageError::ArtifactMissing {
                    stage: stage_name.to_string(),
                    path: artifact.path.display().to_string(),
                });
            }
            let content = std::fs::read(&full_path)?;
            let actual_hash = blake3::hash(&content).to_hex().to_string();
            if actual_hash != artifact.content_hash {
                return Err(StageError::HashMismatch {
                    stage: stage_name.to_string(),
                    path: artifact.path.display().to_string(),
                    expected: artifact.content_hash.clone(),
                    actual: actual_hash,
                });
            }
        }
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoresync_model::manifest::ArtifactRecord;
    use scoresync_model::UniversalId;

    #[test]
    fn missing_manifest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_and_verify_manifest("render", dir.path()).unwrap_err();
        assert!(matches!(err, StageError::ManifestMissing { .. }));
    }

    #[test]
    fn hash_mismatch_is_caught() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("frame.svg"), b"actual bytes").unwrap();

        let mut manifest = Manifest::new("render");
        manifest.record(
            UniversalId::derive("x", 0),
            ArtifactRecord {
                path: "frame.svg".into(),
                content_hash: "0000000000000000000000000000000000000000000000000000000000000".into(),
                byte_size: 12,
            },
        );
        std::fs::write(
            dir.path().join("manifest.json"),
            serde_json::to_vec(&manifest).unwrap(),
        )
        .unwrap();

        let err = load_and_verify_manifest("render", dir.path()).unwrap_err();
        assert!(matches!(err, StageError::HashMismatch { .. }));
    }

    #[test]
    fn matching_hash_passes_verification() {
        let dir = tempfile::tempdir().unwrap();
        let content = b"actual bytes";
        std::fs::write(dir.path().join("frame.svg"), content).unwrap();
        let hash = blake3::hash(content).to_hex().to_string();

        let mut manifest = Manifest::new("render");
        manifest.record(
            UniversalId::derive("x", 0),
            ArtifactRecord {
                path: "frame.svg".into(),
                content_hash: hash,
                byte_size: content.len() as u64,
            },
        );
        std::fs::write(
            dir.path().join("manifest.json"),
            serde_json::to_vec(&manifest).unwrap(),
        )
        .unwrap();

        let loaded = load_and_verify_manifest("render", dir.path()).unwrap();
        assert_eq!(loaded.total_artifact_count(), 1);
    }
}
