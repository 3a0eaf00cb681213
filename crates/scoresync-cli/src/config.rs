//! Layered run configuration: built-in defaults < `scoresync.toml` < CLI flags
//! (SPEC_FULL.md §2 Config, §9.5).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileConfig {
    pub t_window_ms: Option<f64>,
    pub max_workers: Option<usize>,
    pub continue_on_non_critical_failure: Option<bool>,
    pub retry_base_ms: Option<u64>,
    pub retry_max_attempts: Option<u32>,
    pub circuit_failure_threshold: Option<u32>,
    pub circuit_cooldown_secs: Option<u64>,
    pub track_overrides: Option<HashMap<String, usize>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

/// The fully resolved configuration a pipeline run executes with.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub t_window_ms: f64,
    pub max_workers: usize,
    pub continue_on_non_critical_failure: bool,
    pub retry_base: Duration,
    pub retry_max_attempts: u32,
    pub circuit_failure_threshold: u32,
    pub circuit_cooldown: Duration,
    pub track_overrides: HashMap<String, usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            t_window_ms: 100.0,
            max_workers: 4,
            continue_on_non_critical_failure: true,
            retry_base: Duration::from_millis(200),
            retry_max_attempts: 3,
            circuit_failure_threshold: 5,
            circuit_cooldown: Duration::from_secs(30),
            track_overrides: HashMap::new(),
        }
    }
}

impl RunConfig {
    /// Applies a `scoresync.toml` layer on top of the built-in defaults.
    pub fn merge_file(mut self, file: FileConfig) -> Self {
        if let Some(v) = file.t_window_ms {
            self.t_window_ms = v;
        }
        if let Some(v) = file.max_workers {
            self.max_workers = v;
        }
        if let Some(v) = file.continue_on_non_critical_failure {
            self.continue_on_non_critical_failure = v;
        }
        if let Some(v) = file.retry_base_ms {
            self.retry_base = Duration::from_millis(v);
        }
        if let Some(v) = file.retry_max_attempts {
            self.retry_max_attempts = v;
        }
        if let Some(v) = file.circuit_failure_threshold {
            self.circuit_failure_threshold = v;
        }
        if let Some(v) = file.circuit_cooldown_secs {
            self.circuit_cooldown = Duration::from_secs(v);
        }
        if let Some(overrides) = file.track_overrides {
            self.track_overrides.extend(overrides);
        }
        self
    }

    /// Loads `scoresync.toml` from `project_dir` if present, merging it over defaults.
    pub fn load_layered(project_dir: &Path) -> anyhow::Result<Self> {
        let config_path = project_dir.join("scoresync.toml");
        let base = Self::default();
        if config_path.exists() {
            Ok(base.merge_file(FileConfig::load(&config_path)?))
        } else {
            Ok(base)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_no_file_is_present() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::load_layered(dir.path()).unwrap();
        assert_eq!(config.t_window_ms, 100.0);
        assert_eq!(config.max_workers, 4);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("scoresync.toml"),
            "t_window_ms = 50.0\nmax_workers = 8\n",
        )
        .unwrap();
        let config = RunConfig::load_layered(dir.path()).unwrap();
        assert_eq!(config.t_window_ms, 50.0);
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.continue_on_non_critical_failure, true);
    }
}
