use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use super::trash::TrashBin;
use crate::common::errors::DeleteError;
use crate::policy::{PathPolicy, ValidationOutcome};
use crate::scanner::targets::FileEntry;

/// How a delete call behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Move to the trash (true) or remove permanently (false)
    pub move_to_trash: bool,
    /// Skip the path policy entirely. Dangerous.
    pub skip_validation: bool,
    /// Keep going after a failed item instead of aborting the batch
    pub continue_on_error: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            move_to_trash: true,
            skip_validation: false,
            continue_on_error: true,
        }
    }
}

/// Sent before each item of a batch is attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteProgress {
    /// 1-based position of the item about to be deleted
    pub current: usize,
    pub total: usize,
    pub path: PathBuf,
}

/// Per-item outcome of a batch. A path is on at most one side; when the
/// batch was not aborted, every input path is on exactly one side.
#[derive(Debug, Default)]
pub struct BatchDeleteResult {
    pub succeeded: BTreeSet<PathBuf>,
    pub failed: Vec<(PathBuf, DeleteError)>,
}

impl BatchDeleteResult {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total_count(&self) -> usize {
        self.succeeded_count() + self.failed_count()
    }

    pub fn is_all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn is_all_failed(&self) -> bool {
        self.succeeded.is_empty()
    }
}

/// Anything that names a path the deleter can act on
pub trait Deletable {
    fn target_path(&self) -> &Path;
}

impl Deletable for FileEntry {
    fn target_path(&self) -> &Path {
        &self.path
    }
}

impl Deletable for PathBuf {
    fn target_path(&self) -> &Path {
        self
    }
}

/// Deletes paths after consulting the policy, one at a time or in batches
#[derive(Debug, Clone)]
pub struct Deleter {
    policy: Arc<PathPolicy>,
    trash: TrashBin,
}

impl Deleter {
    pub fn new(policy: Arc<PathPolicy>) -> Self {
        Self {
            policy,
            trash: TrashBin::for_current_user(),
        }
    }

    /// Use a specific trash location
    pub fn with_trash(mut self, trash: TrashBin) -> Self {
        self.trash = trash;
        self
    }

    pub fn policy(&self) -> &Arc<PathPolicy> {
        &self.policy
    }

    pub fn trash(&self) -> &TrashBin {
        &self.trash
    }

    /// Delete a single file or directory.
    ///
    /// `Warning` outcomes are logged and do not block; confirming them is the
    /// caller's job. `Unsafe` outcomes always fail with `UnsafePath`. A path
    /// that already sits in the trash is removed permanently even in trash
    /// mode.
    pub fn delete_one(&self, path: &Path, options: &DeleteOptions) -> Result<(), DeleteError> {
        tracing::info!("Deleting: {}", path.display());

        if !options.skip_validation {
            match self.policy.validate(path) {
                ValidationOutcome::Unsafe(reason) => {
                    tracing::error!("Unsafe path: {} - {}", path.display(), reason);
                    return Err(DeleteError::UnsafePath {
                        path: path.to_path_buf(),
                        reason,
                    });
                }
                ValidationOutcome::Warning(reason) => {
                    tracing::warn!("Warning for path: {} - {}", path.display(), reason);
                }
                ValidationOutcome::Safe => {}
            }
        }

        // symlink_metadata so a dangling link still counts as present
        let meta = match std::fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!("File not found: {}", path.display());
                return Err(DeleteError::FileNotFound(path.to_path_buf()));
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(DeleteError::PermissionDenied(path.to_path_buf()));
            }
            Err(e) => return Err(wrap_failure(path, options.move_to_trash, e)),
        };

        // Items already in the trash can only be removed for good
        let already_trashed = self.trash.holds(path);
        let to_trash = options.move_to_trash && !already_trashed;

        let result = if to_trash {
            self.trash.put(path).map(|landed| {
                tracing::info!("Moved to trash: {} -> {}", path.display(), landed.display());
            })
        } else if meta.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };

        result.map_err(|e| {
            tracing::error!("Failed to delete: {} - {}", path.display(), e);
            wrap_failure(path, to_trash, e)
        })?;

        if !to_trash {
            if already_trashed {
                self.trash.forget(path);
            }
            tracing::info!("Permanently deleted: {}", path.display());
        }
        Ok(())
    }

    /// Delete paths in order, reporting progress before each attempt.
    ///
    /// With `continue_on_error` failures are collected and the batch runs to
    /// the end. Without it the first failure aborts with `PartialFailure`;
    /// later paths are left untouched. Repeated paths are attempted once.
    pub fn delete_batch<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &DeleteOptions,
        progress: Option<&Sender<DeleteProgress>>,
    ) -> Result<BatchDeleteResult, DeleteError> {
        let mut seen = HashSet::new();
        let unique: Vec<&Path> = paths
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| seen.insert(*p))
            .collect();
        if unique.len() != paths.len() {
            tracing::debug!("Dropped {} repeated paths from batch", paths.len() - unique.len());
        }

        tracing::info!("Starting batch delete: {} items", unique.len());
        let total = unique.len();
        let mut result = BatchDeleteResult::default();

        for (index, path) in unique.into_iter().enumerate() {
            if let Some(tx) = progress {
                let _ = tx.send(DeleteProgress {
                    current: index + 1,
                    total,
                    path: path.to_path_buf(),
                });
            }

            match self.delete_one(path, options) {
                Ok(()) => {
                    result.succeeded.insert(path.to_path_buf());
                }
                Err(e) => {
                    tracing::warn!("Failed to delete {}: {}", path.display(), e);
                    result.failed.push((path.to_path_buf(), e));

                    if !options.continue_on_error {
                        return Err(DeleteError::PartialFailure {
                            succeeded: result.succeeded_count(),
                            failed: result.failed_count(),
                            errors: result.failed.into_iter().map(|(_, e)| e).collect(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            "Batch delete completed: {} succeeded, {} failed",
            result.succeeded_count(),
            result.failed_count()
        );
        Ok(result)
    }

    /// `delete_batch` over anything carrying a path
    pub fn delete_items<D: Deletable>(
        &self,
        items: &[D],
        options: &DeleteOptions,
        progress: Option<&Sender<DeleteProgress>>,
    ) -> Result<BatchDeleteResult, DeleteError> {
        let paths: Vec<&Path> = items.iter().map(Deletable::target_path).collect();
        self.delete_batch(&paths, options, progress)
    }
}

fn wrap_failure(path: &Path, to_trash: bool, source: std::io::Error) -> DeleteError {
    if to_trash {
        DeleteError::TrashFailed {
            path: path.to_path_buf(),
            source,
        }
    } else {
        DeleteError::DeleteFailed {
            path: path.to_path_buf(),
            source,
        }
    }
}
