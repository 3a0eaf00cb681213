//! Atomic, backed-up registry persistence: write to a tempfile in the target
//! directory, then rename over the destination so a reader never observes a
//! partially-written `registry.json` (spec.md §4.D, §6.2).

use crate::error::RegistryError;
use crate::registry::Registry;
use std::path::Path;

/// Number of rolling backups kept alongside the live registry file.
const BACKUP_COUNT: usize = 3;

/// Writes `registry` to `path` atomically, rotating up to [`BACKUP_COUNT`]
/// `.bak.N` copies of the previous version first.
pub fn save_atomic(registry: &Registry, path: &Path) -> Result<(), RegistryError> {
    if path.exists() {
        rotate_backups(path)?;
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let json = serde_json::to_string_pretty(registry)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|err| RegistryError::Persist {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    use std::io::Write;
    tmp.write_all(json.as_bytes())?;
    tmp.persist(path).map_err(|err| RegistryError::Persist {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    Ok(())
}

fn rotate_backups(path: &Path) -> Result<(), RegistryError> {
    let oldest = path.with_extension(format!("json.bak.{BACKUP_COUNT}"));
    if oldest.exists() {
        std::fs::remove_file(&oldest)?;
    }
    for n in (1..BACKUP_COUNT).rev() {
        let src = path.with_extension(format!("json.bak.{n}"));
        let dst = path.with_extension(format!("json.bak.{}", n + 1));
        if src.exists() {
            std::fs::rename(src, dst)?;
        }
    }
    let first_backup = path.with_extension("json.bak.1");
    std::fs::copy(path, first_backup)?;
    Ok(())
}

/// Loads a registry document from `path`.
pub fn load(path: &Path) -> Result<Registry, RegistryError> {
    let bytes = std::fs::read(path).map_err(|err| RegistryError::Load {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|err| RegistryError::Load {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}
