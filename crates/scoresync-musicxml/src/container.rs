//! Resolves a `.musicxml`/`.xml` path or a compressed `.mxl` container down to
//! raw uncompressed MusicXML bytes (spec.md §4.A, §6.1 input contract).

use crate::error::MusicXmlError;
use std::io::Read;
use std::path::Path;

/// Reads the score file at `path`, transparently unzipping a `.mxl` container
/// and selecting its root file via `META-INF/container.xml`, falling back to
/// the first `.xml` entry that isn't itself the container descriptor.
pub fn read_score_bytes(path: &Path) -> Result<Vec<u8>, MusicXmlError> {
    let path_str = path.display().to_string();
    let is_compressed = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("mxl"))
        .unwrap_or(false);

    if !is_compressed {
        return std::fs::read(path).map_err(|source| MusicXmlError::Io {
            path: path_str,
            source,
        });
    }

    let file = std::fs::File::open(path).map_err(|source| MusicXmlError::Io {
        path: path_str.clone(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|err| MusicXmlError::MalformedContainer {
        path: path_str.clone(),
        reason: err.to_string(),
    })?;

    let root_name = resolve_root_file(&mut archive, &path_str)?;
    let mut entry = archive
        .by_name(&root_name)
        .map_err(|err| MusicXmlError::MalformedContainer {
            path: path_str.clone(),
            reason: format!("root file '{root_name}' missing: {err}"),
        })?;
    let mut buf = Vec::new();
    entry
        .read_to_end(&mut buf)
        .map_err(|source| MusicXmlError::Io {
            path: path_str,
            source,
        })?;
    Ok(buf)
}

fn resolve_root_file(
    archive: &mut zip::ZipArchive<std::fs::File>,
    path_str: &str,
) -> Result<String, MusicXmlError> {
    if let Ok(mut container) = archive.by_name("META-INF/container.xml") {
        let mut xml = String::new();
        container
            .read_to_string(&mut xml)
            .map_err(|source| MusicXmlError::Io {
                path: path_str.to_string(),
                source,
            })?;
        if let Some(start) = xml.find("full-path=\"") {
            let rest = &xml[start + "full-path=\"".len()..];
            if let Some(end) = rest.find('"') {
                return Ok(rest[..end].to_string());
            }
        }
    }

    for i in 0..archive.len() {
        let name = archive
            .by_index(i)
            .map_err(|err| MusicXmlError::MalformedContainer {
                path: path_str.to_string(),
                reason: err.to_string(),
            })?
            .name()
            .to_string();
        if name.to_ascii_lowercase().ends_with(".xml") && !name.starts_with("META-INF") {
            return Ok(name);
        }
    }

    Err(MusicXmlError::MalformedContainer {
        path: path_str.to_string(),
        reason: "no root MusicXML entry found".into(),
    })
}
