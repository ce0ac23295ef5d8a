use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole scan of one root.
///
/// Per-entry read failures never surface here; the scanner logs and skips
/// them. Only the root itself can fail a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("Scan failed at {}: {source}", path.display())]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Path the error refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            ScanError::PathNotFound(p)
            | ScanError::PermissionDenied(p)
            | ScanError::InvalidPath(p) => p,
            ScanError::ScanFailed { path, .. } => path,
        }
    }

    /// Build the error for a root that exists but could not be enumerated
    pub fn from_io(path: PathBuf, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ScanError::PathNotFound(path),
            std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(path),
            _ => ScanError::ScanFailed { path, source: err },
        }
    }

    /// Suggested fix, shown by the CLI under the error line
    pub fn hint(&self) -> &'static str {
        match self {
            ScanError::PathNotFound(_) => "Check if the path exists and try again",
            ScanError::PermissionDenied(_) => {
                "Grant Full Disk Access in System Settings > Privacy & Security"
            }
            ScanError::InvalidPath(_) => "Provide a valid directory path",
            ScanError::ScanFailed { .. } => "Check the error details and try again",
        }
    }
}

/// Failures of a delete operation, for one path or for a whole batch.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// Rejected by the path policy; never silently skipped
    #[error("Unsafe path ({reason}): {}", path.display())]
    UnsafePath { path: PathBuf, reason: String },

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to delete {}: {source}", path.display())]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move to trash {}: {source}", path.display())]
    TrashFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A batch aborted on its first failure (`continue_on_error = false`)
    #[error("Partial failure: {succeeded} succeeded, {failed} failed")]
    PartialFailure {
        succeeded: usize,
        failed: usize,
        errors: Vec<DeleteError>,
    },

    /// Reserved for callers that let the user abort; the core never raises it
    #[error("Operation cancelled by user")]
    UserCancelled,
}

impl DeleteError {
    /// Path the error refers to, if it concerns a single path
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            DeleteError::UnsafePath { path, .. }
            | DeleteError::DeleteFailed { path, .. }
            | DeleteError::TrashFailed { path, .. } => Some(path),
            DeleteError::PermissionDenied(p) | DeleteError::FileNotFound(p) => Some(p),
            DeleteError::PartialFailure { .. } | DeleteError::UserCancelled => None,
        }
    }

    /// Whether the underlying cause was a permission problem
    pub fn is_permission_denied(&self) -> bool {
        match self {
            DeleteError::PermissionDenied(_) => true,
            DeleteError::DeleteFailed { source, .. } | DeleteError::TrashFailed { source, .. } => {
                source.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }

    /// Short machine-readable kind, used in JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            DeleteError::UnsafePath { .. } => "unsafe_path",
            DeleteError::PermissionDenied(_) => "permission_denied",
            DeleteError::FileNotFound(_) => "file_not_found",
            DeleteError::DeleteFailed { .. } => "delete_failed",
            DeleteError::TrashFailed { .. } => "trash_failed",
            DeleteError::PartialFailure { .. } => "partial_failure",
            DeleteError::UserCancelled => "user_cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_scan_error_from_io_kind() {
        let p = PathBuf::from("/tmp/x");
        let e = ScanError::from_io(p.clone(), io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(e, ScanError::PermissionDenied(_)));
        let e = ScanError::from_io(p.clone(), io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(e, ScanError::PathNotFound(_)));
        let e = ScanError::from_io(p, io::Error::other("boom"));
        assert!(matches!(e, ScanError::ScanFailed { .. }));
        assert!(e.source().is_some());
    }

    #[test]
    fn test_delete_error_display() {
        let e = DeleteError::PartialFailure {
            succeeded: 2,
            failed: 1,
            errors: Vec::new(),
        };
        assert_eq!(e.to_string(), "Partial failure: 2 succeeded, 1 failed");
        assert!(e.path().is_none());
    }

    #[test]
    fn test_trash_failed_permission() {
        let e = DeleteError::TrashFailed {
            path: PathBuf::from("/tmp/a"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(e.is_permission_denied());
        assert_eq!(e.kind(), "trash_failed");
    }
}
