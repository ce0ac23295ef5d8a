use std::path::Path;

/// Home-relative locations that macOS gates behind Full Disk Access
const FDA_PATHS: &[&str] = &[
    "Library/Mail",
    "Library/Messages",
    "Library/Safari",
    "Library/Cookies",
    "Library/HomeKit",
    "Library/Metadata/CoreSpotlight",
    "Library/Containers/com.apple.Safari",
];

/// Check if a path likely requires Full Disk Access
pub fn requires_full_disk_access(path: &Path) -> bool {
    let path_str = path.to_string_lossy();
    FDA_PATHS.iter().any(|p| path_str.contains(p))
}

/// Check if a directory can be enumerated by this process
pub fn can_read(path: &Path) -> bool {
    if path.is_dir() {
        std::fs::read_dir(path).is_ok()
    } else {
        std::fs::metadata(path).is_ok()
    }
}

/// Roots among `paths` that exist but cannot be read
pub fn unreadable_roots<'a>(paths: &'a [std::path::PathBuf]) -> Vec<&'a Path> {
    paths
        .iter()
        .filter(|p| p.exists() && !can_read(p))
        .map(|p| p.as_path())
        .collect()
}

/// Get a helpful message for permission issues
pub fn permission_hint(path: &Path) -> String {
    if requires_full_disk_access(path) || path.ends_with(".Trash") {
        "This path requires Full Disk Access. Grant it in System Settings > Privacy & Security > Full Disk Access."
            .to_string()
    } else {
        format!(
            "Check file permissions for '{}'. Mole only cleans locations owned by the current user.",
            path.display()
        )
    }
}

/// Check if the current process has Full Disk Access.
/// Heuristic: try to list a known FDA-protected directory.
pub fn has_full_disk_access() -> bool {
    if let Some(home) = dirs::home_dir() {
        for probe in ["Library/Mail", "Library/Safari"] {
            let test_path = home.join(probe);
            if test_path.exists() {
                return std::fs::read_dir(&test_path).is_ok();
            }
        }
    }
    // Nothing to probe; assume yes
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fda_paths() {
        assert!(requires_full_disk_access(Path::new("/Users/t/Library/Mail/V9")));
        assert!(!requires_full_disk_access(Path::new("/Users/t/Library/Caches/foo")));
    }

    #[test]
    fn test_unreadable_roots_skips_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let roots = vec![dir.path().to_path_buf(), dir.path().join("missing")];
        assert!(unreadable_roots(&roots).is_empty());
    }
}
