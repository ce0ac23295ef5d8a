use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::walker;

// ─── Core types ───────────────────────────────────────────────────────────────

/// A filesystem entry as produced by the scanner. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: SystemTime,
    pub is_dir: bool,
}

impl FileEntry {
    /// Final path component, for display
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Cleanup category. Declaration order is the fixed sweep order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    UserCaches,
    UserLogs,
    Trash,
    BrowserCaches,
    DevToolCaches,
    TempFiles,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::UserCaches,
        Category::UserLogs,
        Category::Trash,
        Category::BrowserCaches,
        Category::DevToolCaches,
        Category::TempFiles,
    ];

    /// Stable identifier used on the command line and in config
    pub fn id(&self) -> &'static str {
        match self {
            Category::UserCaches => "user_caches",
            Category::UserLogs => "user_logs",
            Category::Trash => "trash",
            Category::BrowserCaches => "browser_caches",
            Category::DevToolCaches => "dev_tool_caches",
            Category::TempFiles => "temp_files",
        }
    }

    pub fn from_id(id: &str) -> Option<Category> {
        Category::ALL.iter().copied().find(|c| c.id() == id)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Category::UserCaches => "App caches in ~/Library/Caches",
            Category::UserLogs => "Log files in ~/Library/Logs",
            Category::Trash => "Files waiting in the Trash",
            Category::BrowserCaches => "Safari, Chrome, Firefox and other browser caches",
            Category::DevToolCaches => "Xcode DerivedData, npm, yarn, pip, Cargo and more",
            Category::TempFiles => "Diagnostic reports and autosave leftovers",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::UserCaches => write!(f, "User Caches"),
            Category::UserLogs => write!(f, "User Logs"),
            Category::Trash => write!(f, "Trash"),
            Category::BrowserCaches => write!(f, "Browser Caches"),
            Category::DevToolCaches => write!(f, "Developer Caches"),
            Category::TempFiles => write!(f, "Temp & Crash Files"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_id(s).ok_or_else(|| {
            let known: Vec<&str> = Category::ALL.iter().map(|c| c.id()).collect();
            format!("unknown category '{}' (expected one of: {})", s, known.join(", "))
        })
    }
}

// ─── Category table ───────────────────────────────────────────────────────────

const USER_CACHE_PATHS: &[&str] = &["Library/Caches"];

const USER_LOG_PATHS: &[&str] = &["Library/Logs"];

const TRASH_PATHS: &[&str] = &[".Trash"];

const BROWSER_CACHE_PATHS: &[&str] = &[
    "Library/Caches/com.apple.Safari",
    "Library/Caches/Google/Chrome",
    "Library/Application Support/Google/Chrome/Default/GPUCache",
    "Library/Application Support/Google/Chrome/Default/Application Cache",
    "Library/Caches/com.microsoft.edgemac",
    "Library/Caches/Firefox",
    "Library/Application Support/Firefox/Profiles",
    "Library/Caches/company.thebrowser.Browser",
    "Library/Caches/BraveSoftware/Brave-Browser",
    "Library/Caches/com.operasoftware.Opera",
];

const DEV_TOOL_CACHE_PATHS: &[&str] = &[
    // Xcode
    "Library/Developer/Xcode/DerivedData",
    "Library/Developer/Xcode/Archives",
    "Library/Developer/Xcode/Products",
    "Library/Caches/com.apple.dt.Xcode",
    "Library/Developer/Xcode/iOS DeviceSupport",
    "Library/Developer/Xcode/watchOS DeviceSupport",
    "Library/Developer/Xcode/tvOS DeviceSupport",
    "Library/Developer/Xcode/visionOS DeviceSupport",
    "Library/Developer/CoreSimulator/Caches",
    // JavaScript package managers
    ".npm/_cacache",
    "Library/pnpm/store",
    ".pnpm-store",
    ".yarn/cache",
    ".bun/install/cache",
    // Python
    ".cache/pip",
    ".cache/poetry",
    ".cache/uv",
    ".cache/ruff",
    ".cache/mypy",
    ".pyenv/cache",
    // Go
    ".cache/go-build",
    // Rust
    ".cargo/registry/cache",
    ".cargo/git",
    ".rustup/downloads",
    // Ruby, CocoaPods, SwiftPM
    ".bundle/cache",
    "Library/Caches/CocoaPods",
    ".cache/swift-package-manager",
    // Frontend build tools
    ".cache/typescript",
    ".cache/electron",
    ".cache/node-gyp",
    ".cache/turbo",
    ".cache/vite",
    ".cache/webpack",
    ".parcel-cache",
    // Shell, containers, cloud CLIs
    ".oh-my-zsh/cache",
    ".docker/buildx/cache",
    ".kube/cache",
    ".aws/cli/cache",
    ".config/gcloud/logs",
    ".azure/logs",
    // Editors
    "Library/Caches/com.microsoft.VSCode",
    "Library/Application Support/Code/CachedData",
    "Library/Application Support/Code/CachedExtensionVSIXs",
    "Library/Application Support/Code/GPUCache",
    "Library/Application Support/Code/DawnGraphiteCache",
    "Library/Application Support/Code/DawnWebGPUCache",
    "Library/Application Support/Code/logs",
    "Library/Caches/Zed",
    // Android
    ".android/build-cache",
    ".android/cache",
];

const TEMP_FILE_PATHS: &[&str] = &[
    "Library/DiagnosticReports",
    "Library/Autosave Information",
    "Library/Logs/DiagnosticReports",
];

/// Cache locations users rely on even though they look like junk
const DEFAULT_PROTECTED_PREFIXES: &[&str] = &[
    "Library/Caches/ms-playwright",
    ".cache/huggingface",
    ".ollama/models",
    "Library/Caches/com.nssurge.surge-mac",
    "Library/Application Support/com.nssurge.surge-mac",
    "Library/Caches/org.R-project.R/R/renv",
    "Library/Caches/pypoetry/virtualenvs",
    ".cache/poetry/virtualenvs",
    "Library/Caches/com.apple.finder",
    "Library/Mobile Documents",
    "Library/Caches/com.apple.FontRegistry",
    "Library/Caches/com.apple.spotlight",
    "Library/Caches/com.apple.Spotlight",
    "Library/Caches/CloudKit",
    ".gradle/caches",
    ".gradle/daemon",
    "Library/Caches/JetBrains",
    "Library/Application Support/JetBrains",
];

/// Read-only mapping from each category to its ordered root paths, plus
/// the prefixes that are always excluded from cleanup.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    roots: BTreeMap<Category, Vec<PathBuf>>,
    protected_prefixes: Vec<PathBuf>,
}

impl CategoryTable {
    /// Built-in table for the current user's home directory
    pub fn for_current_user() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/Users/unknown"));
        Self::for_home(&home)
    }

    /// Built-in table rooted at an arbitrary home directory
    pub fn for_home(home: &Path) -> Self {
        let join = |rel: &[&str]| rel.iter().map(|r| home.join(r)).collect::<Vec<_>>();
        let mut roots = BTreeMap::new();
        for category in Category::ALL {
            let rel = match category {
                Category::UserCaches => USER_CACHE_PATHS,
                Category::UserLogs => USER_LOG_PATHS,
                Category::Trash => TRASH_PATHS,
                Category::BrowserCaches => BROWSER_CACHE_PATHS,
                Category::DevToolCaches => DEV_TOOL_CACHE_PATHS,
                Category::TempFiles => TEMP_FILE_PATHS,
            };
            roots.insert(category, join(rel));
        }
        Self {
            roots,
            protected_prefixes: join(DEFAULT_PROTECTED_PREFIXES),
        }
    }

    /// A table with explicit roots and no default protections
    pub fn empty() -> Self {
        Self {
            roots: Category::ALL.iter().map(|c| (*c, Vec::new())).collect(),
            protected_prefixes: Vec::new(),
        }
    }

    /// Replace the roots of one category
    pub fn with_roots(mut self, category: Category, roots: Vec<PathBuf>) -> Self {
        self.roots.insert(category, roots);
        self
    }

    /// Add a default protected prefix
    pub fn with_protected_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.protected_prefixes.push(prefix.into());
        self
    }

    /// Append extra roots from config, keyed by category id. `~` and globs
    /// are expanded. Unknown ids are reported back to the caller.
    pub fn extend_from_config(&mut self, extra: &BTreeMap<String, Vec<String>>) -> Vec<String> {
        let mut unknown = Vec::new();
        for (id, patterns) in extra {
            match Category::from_id(id) {
                Some(category) => {
                    let expanded = walker::expand_paths(patterns);
                    self.roots.entry(category).or_default().extend(expanded);
                }
                None => unknown.push(id.clone()),
            }
        }
        unknown
    }

    /// Ordered root paths for a category
    pub fn paths(&self, category: Category) -> &[PathBuf] {
        self.roots.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn protected_prefixes(&self) -> &[PathBuf] {
        &self.protected_prefixes
    }

    /// Whether a path falls under one of the default protected prefixes
    pub fn is_default_protected(&self, path: &Path) -> bool {
        self.protected_prefixes.iter().any(|p| path.starts_with(p))
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::for_current_user()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_ids_roundtrip() {
        for category in Category::ALL {
            assert_eq!(Category::from_id(category.id()), Some(category));
            assert_eq!(category.id().parse::<Category>(), Ok(category));
        }
        assert!("bogus".parse::<Category>().is_err());
    }

    #[test]
    fn test_all_is_declaration_order() {
        let mut sorted = Category::ALL;
        sorted.sort();
        assert_eq!(sorted, Category::ALL);
    }

    #[test]
    fn test_table_roots_are_under_home() {
        let home = Path::new("/Users/test");
        let table = CategoryTable::for_home(home);
        for category in Category::ALL {
            assert!(!table.paths(category).is_empty(), "{} has no roots", category);
            assert!(table.paths(category).iter().all(|p| p.starts_with(home)));
        }
        assert_eq!(table.paths(Category::Trash), [home.join(".Trash")]);
    }

    #[test]
    fn test_default_protected_is_component_wise() {
        let table = CategoryTable::for_home(Path::new("/Users/test"));
        assert!(table.is_default_protected(Path::new("/Users/test/.gradle/caches/modules-2")));
        assert!(table.is_default_protected(Path::new("/Users/test/Library/Caches/JetBrains")));
        assert!(!table.is_default_protected(Path::new("/Users/test/Library/Caches/JetBrainsToolbox")));
        assert!(!table.is_default_protected(Path::new("/Users/test/Library/Caches/com.spotify")));
    }

    #[test]
    fn test_extend_from_config() {
        let mut table = CategoryTable::empty();
        let mut extra = BTreeMap::new();
        extra.insert("user_logs".to_string(), vec!["/var/tmp/app-logs".to_string()]);
        extra.insert("nope".to_string(), vec!["/x".to_string()]);
        let unknown = table.extend_from_config(&extra);
        assert_eq!(unknown, vec!["nope".to_string()]);
        assert_eq!(table.paths(Category::UserLogs), [PathBuf::from("/var/tmp/app-logs")]);
    }
}
