pub mod rules;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rules::RuleContext;

/// System locations that must never be deleted, nor anything below them.
const CRITICAL_ROOTS: &[&str] = &[
    "/System",
    "/bin",
    "/sbin",
    "/usr",
    "/Library",
    "/private",
    "/dev",
    "/etc",
    "/var/db",
    "/var/root",
];

/// Bundled applications that deserve a confirmation before removal
const SYSTEM_APPS: &[&str] = &[
    "/Applications/Safari.app",
    "/Applications/Mail.app",
    "/Applications/Messages.app",
    "/Applications/FaceTime.app",
    "/Applications/Calendar.app",
    "/Applications/Contacts.app",
    "/Applications/Notes.app",
    "/Applications/Reminders.app",
    "/Applications/Music.app",
    "/Applications/TV.app",
    "/Applications/Photos.app",
    "/Applications/App Store.app",
    "/Applications/System Settings.app",
    "/Applications/System Preferences.app",
];

/// Top-level home folders holding the user's own documents
const USER_FOLDERS: &[&str] = &["Documents", "Desktop", "Pictures", "Music", "Movies", "Downloads"];

/// Result of validating one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// May be deleted
    Safe,
    /// May be deleted, but the caller should confirm with the user
    Warning(String),
    /// Must not be deleted
    Unsafe(String),
}

impl ValidationOutcome {
    pub fn is_safe(&self) -> bool {
        matches!(self, ValidationOutcome::Safe)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationOutcome::Warning(_))
    }

    pub fn is_unsafe(&self) -> bool {
        matches!(self, ValidationOutcome::Unsafe(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Safe => None,
            ValidationOutcome::Warning(r) | ValidationOutcome::Unsafe(r) => Some(r),
        }
    }
}

/// Fixed locations the rule chain compares against
#[derive(Debug, Clone)]
pub struct PolicyRoots {
    pub home: PathBuf,
    pub applications: PathBuf,
    pub critical_roots: Vec<PathBuf>,
    pub system_apps: Vec<PathBuf>,
    pub user_folders: Vec<String>,
}

impl PolicyRoots {
    /// Standard macOS layout for an arbitrary home directory
    pub fn for_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            applications: PathBuf::from("/Applications"),
            critical_roots: CRITICAL_ROOTS.iter().map(PathBuf::from).collect(),
            system_apps: SYSTEM_APPS.iter().map(PathBuf::from).collect(),
            user_folders: USER_FOLDERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn for_current_user() -> Self {
        Self::for_home(dirs::home_dir().unwrap_or_else(|| PathBuf::from("/Users/unknown")))
    }
}

/// Decides whether a path may be deleted.
///
/// Owns the protected-paths set (historically called the whitelist: paths in
/// it are *protected from* deletion, not approved for it). The set starts
/// empty and changes only through [`protect`](Self::protect) and
/// [`unprotect`](Self::unprotect). All access goes through one mutex, so
/// mutations and validations are linearized and a batch sees one snapshot.
#[derive(Debug)]
pub struct PathPolicy {
    roots: PolicyRoots,
    protected: Mutex<HashSet<OsString>>,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl PathPolicy {
    pub fn new() -> Self {
        Self::with_roots(PolicyRoots::for_current_user())
    }

    pub fn with_roots(roots: PolicyRoots) -> Self {
        Self {
            roots,
            protected: Mutex::new(HashSet::new()),
        }
    }

    pub fn roots(&self) -> &PolicyRoots {
        &self.roots
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<OsString>> {
        self.protected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate one path against the rule chain
    pub fn validate(&self, path: &Path) -> ValidationOutcome {
        let protected = self.lock();
        rules::evaluate(&RuleContext::new(&self.roots, &protected), path)
    }

    /// Validate each path independently against one snapshot of the
    /// protected set
    pub fn validate_batch<P: AsRef<Path>>(&self, paths: &[P]) -> BTreeMap<PathBuf, ValidationOutcome> {
        let protected = self.lock();
        let ctx = RuleContext::new(&self.roots, &protected);
        paths
            .iter()
            .map(|p| {
                let p = p.as_ref();
                (p.to_path_buf(), rules::evaluate(&ctx, p))
            })
            .collect()
    }

    /// Protect a path from deletion. Matching is on the exact string, so
    /// `/a/b/` and `/a/b` are distinct entries.
    pub fn protect(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::info!("Added to protected paths: {}", path.display());
        self.lock().insert(path.into_os_string());
    }

    /// Lift the protection on a path
    pub fn unprotect(&self, path: &Path) {
        if self.lock().remove(path.as_os_str()) {
            tracing::info!("Removed from protected paths: {}", path.display());
        }
    }

    /// Snapshot of the protected set, sorted
    pub fn protected_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.lock().iter().map(PathBuf::from).collect();
        paths.sort();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_helpers() {
        assert!(ValidationOutcome::Safe.is_safe());
        assert_eq!(ValidationOutcome::Safe.reason(), None);
        let w = ValidationOutcome::Warning("w".into());
        assert!(w.is_warning() && !w.is_unsafe());
        assert_eq!(w.reason(), Some("w"));
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_string(&ValidationOutcome::Unsafe("x".into())).unwrap();
        assert_eq!(json, r#"{"outcome":"unsafe","reason":"x"}"#);
        let json = serde_json::to_string(&ValidationOutcome::Safe).unwrap();
        assert_eq!(json, r#"{"outcome":"safe"}"#);
    }

    #[test]
    fn test_root_paths() {
        let policy = PathPolicy::with_roots(PolicyRoots::for_home("/Users/test"));
        assert!(policy.validate(Path::new("/System")).is_unsafe());
        assert!(policy.validate(Path::new("/usr/bin/ls")).is_unsafe());
        assert!(policy.validate(Path::new("/Users/test/Library/Caches/x")).is_safe());
    }
}
