//! Content-addressed cache for stage outputs (SPEC_FULL.md §9.2, supplemental).
//!
//! Keyed on a BLAKE3 hash of the stage name, its input registry slice, and a
//! stage version string, mirroring the generation cache pattern used
//! elsewhere in this codebase for recipe-keyed asset caching.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheKey {
    pub stage_name: String,
    pub input_hash: String,
    pub stage_version: String,
}

impl CacheKey {
    pub fn new(stage_name: impl Into<String>, input_bytes: &[u8], stage_version: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            input_hash: blake3::hash(input_bytes).to_hex().to_string(),
            stage_version: stage_version.into(),
        }
    }

    pub fn compute_hash(&self) -> String {
        let canonical = format!(
            "stage:{},input:{},version:{}",
            self.stage_name, self.input_hash, self.stage_version
        );
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheManifest {
    key: CacheKey,
    files: Vec<String>,
}

/// Manages a local on-disk cache of stage output directories.
pub struct StageCache {
    cache_dir: PathBuf,
}

impl StageCache {
    pub fn new() -> Option<Self> {
        Some(Self {
            cache_dir: dirs::cache_dir()?.join("scoresync").join("stages"),
        })
    }

    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.cache", key.compute_hash()))
    }

    pub fn has_entry(&self, key: &CacheKey) -> bool {
        self.entry_path(key).join("manifest.json").exists()
    }

    /// Copies a cached stage output tree into `out_dir`; `None` on a cache miss.
    pub fn get(&self, key: &CacheKey, out_dir: &Path) -> std::io::Result<Option<Vec<PathBuf>>> {
        let entry_path = self.entry_path(key);
        let manifest_path = entry_path.join("manifest.json");
        if !manifest_path.exists() {
            return Ok(None);
        }
        let manifest: CacheManifest = serde_json::from_slice(&fs::read(&manifest_path)?)?;
        let mut copied = Vec::new();
        for rel in &manifest.files {
            let src = entry_path.join(rel);
            let dst = out_dir.join(rel);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&src, &dst)?;
            copied.push(dst);
        }
        Ok(Some(copied))
    }

    /// Stores `out_dir`'s files (given as paths relative to `out_dir`) in the cache.
    pub fn put(&self, key: &CacheKey, out_dir: &Path, relative_files: &[PathBuf]) -> std::io::Result<()> {
        let entry_path = self.entry_path(key);
        fs::create_dir_all(&entry_path)?;
        for rel in relative_files {
            let src = out_dir.join(rel);
            let dst = entry_path.join(rel);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&src, &dst)?;
        }
        let manifest = CacheManifest {
            key: key.clone(),
            files: relative_files.iter().map(|p| p.display().to_string()).collect(),
        };
        fs::write(entry_path.join("manifest.json"), serde_json::to_vec_pretty(&manifest)?)?;
        Ok(())
    }

    /// Removes every cache entry, returning the count removed.
    pub fn clear(&self) -> std::io::Result<u64> {
        if !self.cache_dir.exists() {
            return Ok(0);
        }
        let mut count = 0;
        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() && path.extension().and_then(|e| e.to_str()) == Some("cache") {
                fs::remove_dir_all(&path)?;
                count += 1;
            }
        }
        Ok(count)
    }
}
