//! ZIP archiving of finished workspaces

use crate::error::{Error, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::FileOptions;

/// Compress the directory `source` into the ZIP file `target`
///
/// Entry names keep the directory's own name as their first component
/// (`links/`, `links/1.html`, `links/index.txt`), directories carry a trailing `/`,
/// and files are deflated. Entries are added in file-name order.
///
/// Returns `Ok(None)` without creating anything when `source` does not exist.
/// On failure the incomplete archive is removed.
///
/// This is blocking I/O; async callers run it on the blocking pool.
pub fn zip_directory(source: &Path, target: &Path) -> Result<Option<PathBuf>> {
    if !source.exists() {
        debug!(?source, "nothing to archive");
        return Ok(None);
    }

    match write_archive(source, target) {
        Ok(entries) => {
            info!(?target, entries, "archive created");
            Ok(Some(target.to_path_buf()))
        }
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(target)
                && cleanup.kind() != io::ErrorKind::NotFound
            {
                warn!(?target, error = %cleanup, "failed to remove incomplete archive");
            }
            Err(Error::Archive {
                archive: target.to_path_buf(),
                reason: e.to_string(),
            })
        }
    }
}

/// Write every entry under `source`; returns the number of entries written
fn write_archive(source: &Path, target: &Path) -> Result<usize> {
    let base = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file = File::create(target)?;
    let mut zip = zip::ZipWriter::new(file);
    let file_options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let dir_options = FileOptions::default();

    let mut entries = 0;
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| io::Error::other(format!("failed to walk directory: {}", e)))?;
        let name = entry_name(&base, source, entry.path());

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), dir_options)?;
        } else {
            zip.start_file(name, file_options)?;
            let mut input = File::open(entry.path())?;
            io::copy(&mut input, &mut zip)?;
        }
        entries += 1;
    }

    zip.finish()?;
    Ok(entries)
}

/// `<base>/<path relative to source>` with `/` separators
fn entry_name(base: &str, source: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(source).unwrap_or(path);
    let mut name = base.to_string();
    for component in relative.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}
