pub mod targets;
pub mod walker;

use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use crate::common::errors::ScanError;
use targets::FileEntry;

/// Progress message emitted while a scan runs. Advisory only.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanProgress {
    /// 0.0 while running (the total is unknown up front), 1.0 when done
    pub fraction: f64,
    pub items: usize,
    pub current_path: PathBuf,
}

/// Counts over a set of scanned entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStatistics {
    pub file_count: usize,
    pub dir_count: usize,
    /// Sum over non-directory entries
    pub total_size: u64,
}

/// Output of a multi-root scan: merged entries plus any roots that failed
#[derive(Debug, Default)]
pub struct MultiScan {
    pub entries: Vec<FileEntry>,
    pub errors: Vec<ScanError>,
}

/// Lists filesystem entries under roots. Individual unreadable entries are
/// logged and skipped; only a missing or unlistable root fails a scan.
#[derive(Debug, Clone)]
pub struct Scanner {
    progress_interval: usize,
    measure_directories: bool,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            progress_interval: 100,
            measure_directories: false,
        }
    }

    /// Report progress every `n` entries
    pub fn with_progress_interval(mut self, n: usize) -> Self {
        self.progress_interval = n.max(1);
        self
    }

    /// Give directory entries their recursive size instead of 0
    pub fn with_directory_sizes(mut self, measure: bool) -> Self {
        self.measure_directories = measure;
        self
    }

    /// Scan `root`. With `recursive = false` only immediate children are
    /// returned. The root itself is never part of the output.
    pub fn scan(
        &self,
        root: &Path,
        recursive: bool,
        progress: Option<&Sender<ScanProgress>>,
    ) -> Result<Vec<FileEntry>, ScanError> {
        tracing::info!("Starting scan at: {}", root.display());

        let root_meta = match std::fs::metadata(root) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Path not found: {}", root.display());
                return Err(ScanError::PathNotFound(root.to_path_buf()));
            }
            Err(e) => return Err(ScanError::from_io(root.to_path_buf(), e)),
        };

        // A root that exists but cannot be listed fails the whole scan;
        // everything below it is best effort.
        if root_meta.is_dir() {
            if let Err(e) = std::fs::read_dir(root) {
                tracing::warn!("Cannot enumerate {}: {}", root.display(), e);
                return Err(match e.kind() {
                    std::io::ErrorKind::PermissionDenied => {
                        ScanError::PermissionDenied(root.to_path_buf())
                    }
                    _ => ScanError::InvalidPath(root.to_path_buf()),
                });
            }
        }

        let mut items = Vec::new();
        for entry in walker::walker(root, recursive) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            match walker::to_file_entry(&entry, self.measure_directories) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::warn!("Failed to read attributes for {}: {}", entry.path().display(), e);
                    continue;
                }
            }

            if items.len() % self.progress_interval == 0 {
                send_progress(progress, 0.0, items.len(), entry.path());
            }
        }

        tracing::info!("Scan completed. Found {} items at: {}", items.len(), root.display());
        send_progress(progress, 1.0, items.len(), root);

        Ok(items)
    }

    /// Scan several roots concurrently, one task per root. Output order is
    /// unspecified. A failing root is recorded and does not affect others.
    pub fn scan_many(
        &self,
        roots: &[PathBuf],
        recursive: bool,
        progress: Option<&Sender<ScanProgress>>,
    ) -> MultiScan {
        tracing::info!("Starting concurrent scan for {} roots", roots.len());

        let per_root: Vec<Result<Vec<FileEntry>, ScanError>> = roots
            .par_iter()
            .map_with(progress.cloned(), |tx, root| self.scan(root, recursive, tx.as_ref()))
            .collect();

        let mut merged = MultiScan::default();
        for result in per_root {
            match result {
                Ok(entries) => merged.entries.extend(entries),
                Err(e) => {
                    tracing::warn!("Root scan failed: {}", e);
                    merged.errors.push(e);
                }
            }
        }

        tracing::info!(
            "Concurrent scan completed. Total items: {} ({} roots failed)",
            merged.entries.len(),
            merged.errors.len()
        );
        merged
    }

    /// Size of a file, or the sum of all non-directory descendants of a
    /// directory. Unreadable descendants contribute zero.
    pub fn total_size(&self, path: &Path) -> Result<u64, ScanError> {
        let meta = std::fs::symlink_metadata(path)
            .map_err(|e| ScanError::from_io(path.to_path_buf(), e))?;
        if meta.is_dir() {
            Ok(walker::dir_size(path))
        } else {
            Ok(meta.len())
        }
    }

    /// File/directory counts and total size for a set of entries
    pub fn statistics(entries: &[FileEntry]) -> ScanStatistics {
        entries.iter().fold(ScanStatistics::default(), |mut acc, e| {
            if e.is_dir {
                acc.dir_count += 1;
            } else {
                acc.file_count += 1;
                acc.total_size += e.size_bytes;
            }
            acc
        })
    }
}

fn send_progress(tx: Option<&Sender<ScanProgress>>, fraction: f64, items: usize, path: &Path) {
    if let Some(tx) = tx {
        // A dropped receiver only means nobody is watching
        let _ = tx.send(ScanProgress {
            fraction,
            items,
            current_path: path.to_path_buf(),
        });
    }
}
