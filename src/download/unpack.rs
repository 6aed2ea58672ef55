use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::{ConnectorError, Result};

/// Extract every entry of `zip_path` next to the archive, preserving relative
/// paths and creating intermediate directories. Returns the destination
/// directory. An archive without any `.jpg` members is not an error at this
/// layer — readiness decides that.
pub fn unpack(zip_path: &Path) -> Result<PathBuf> {
    let dest = zip_path
        .parent()
        .ok_or_else(|| ConnectorError::data("unpack", "archive has no parent directory"))?
        .to_path_buf();

    let file = File::open(zip_path)
        .map_err(|e| ConnectorError::data(zip_path.display().to_string(), e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| ConnectorError::data(zip_path.display().to_string(), e))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ConnectorError::data(zip_path.display().to_string(), e))?;
        // Entries with unsafe paths (absolute, `..`) are skipped.
        let Some(rel) = entry.enclosed_name() else {
            continue;
        };
        let out = dest.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut target = File::create(&out)?;
        std::io::copy(&mut entry, &mut target)?;
        debug!(entry = %out.display(), "unpacked");
    }

    Ok(dest)
}
