use crate::error::{ConvertError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lazily list every regular file under `root` whose extension matches
/// `extension` (ASCII case-insensitive, leading dot optional).
///
/// Entries are visited in file-name order so repeated runs see the same
/// sequence. Unreadable entries below the root are logged and skipped.
pub fn discover(root: &Path, extension: &str) -> Result<impl Iterator<Item = PathBuf>> {
    let meta = std::fs::metadata(root).map_err(|e| ConvertError::Discovery {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !meta.is_dir() {
        return Err(ConvertError::Discovery {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    std::fs::read_dir(root).map_err(|e| ConvertError::Discovery {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    let wanted = extension.trim_start_matches('.').to_string();
    let files = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| {
            if e.path_is_symlink() {
                tracing::debug!("skipping symlink: {}", e.path().display());
                return false;
            }
            e.file_type().is_file()
        })
        .filter(move |e| has_extension(e.path(), &wanted))
        .map(|e| e.into_path());

    Ok(files)
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}
