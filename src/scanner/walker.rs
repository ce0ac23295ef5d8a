use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::{DirEntry, WalkDir};

use super::targets::FileEntry;
use crate::common::config::expand_tilde;

/// Walker over the descendants of `root`, never following symlinks.
/// The root itself is not yielded.
pub fn walker(root: &Path, recursive: bool) -> WalkDir {
    let walker = WalkDir::new(root).follow_links(false).min_depth(1);
    if recursive {
        walker
    } else {
        walker.max_depth(1)
    }
}

/// Build a `FileEntry` from a walked entry. Directories report size 0
/// unless `measure_dirs` asks for their recursive total.
pub fn to_file_entry(entry: &DirEntry, measure_dirs: bool) -> Result<FileEntry, walkdir::Error> {
    let metadata = entry.metadata()?;
    let is_dir = metadata.is_dir();
    let size_bytes = if is_dir {
        if measure_dirs {
            dir_size(entry.path())
        } else {
            0
        }
    } else {
        metadata.len()
    };

    Ok(FileEntry {
        path: entry.path().to_path_buf(),
        size_bytes,
        modified: metadata.modified().unwrap_or_else(|_| SystemTime::now()),
        is_dir,
    })
}

/// Total size of every non-directory entry under `path`. Unreadable
/// descendants are skipped and contribute nothing.
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::debug!("Skipping unreadable entry while sizing {}: {}", path.display(), err);
                None
            }
        })
        .filter(|e| !e.file_type().is_dir())
        .map(|e| e.metadata().map(|m| m.len()).unwrap_or(0))
        .sum()
}

/// Expand `~` and glob patterns in paths
pub fn expand_paths(paths: &[String]) -> Vec<PathBuf> {
    let mut expanded = Vec::new();

    for path_str in paths {
        let resolved = expand_tilde(path_str);

        if path_str.contains(['*', '?', '[']) {
            match glob::glob(&resolved.to_string_lossy()) {
                Ok(entries) => expanded.extend(entries.filter_map(|e| e.ok())),
                Err(e) => tracing::warn!("Invalid glob pattern '{}': {}", path_str, e),
            }
        } else {
            expanded.push(resolved);
        }
    }

    expanded
}
