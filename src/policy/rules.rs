//! The ordered rule chain behind [`PathPolicy::validate`](super::PathPolicy::validate).
//!
//! Rules are evaluated top to bottom and the first one that produces an
//! outcome wins. The order is data (`RULE_CHAIN`) so it can be inspected
//! and tested on its own; overlapping protections resolve by position.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use super::{PolicyRoots, ValidationOutcome};

/// Upper bound on symlink hops followed while validating one path
pub const MAX_SYMLINK_DEPTH: usize = 8;

pub const REASON_PROTECTED: &str = "Path is in whitelist";
pub const REASON_CRITICAL: &str = "Critical system path";
pub const REASON_SYSTEM_APP: &str = "System application";
pub const REASON_TRAVERSAL: &str = "Path traversal detected";
pub const REASON_SYMLINK: &str = "Symlink target is unsafe";
pub const REASON_SYMLINK_LOOP: &str = "Symlink loop detected";
pub const REASON_USER_FOLDER: &str = "User important folder";
pub const REASON_OUTSIDE_HOME: &str = "Outside user directory";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Exact string match in the protected-paths set
    Protected,
    /// Equal to or below a system-critical root
    CriticalSystemPath,
    /// Exact match of a bundled system application
    SystemApplication,
    /// Contains a `..` component
    PathTraversal,
    /// A symlink whose target validates as unsafe
    SymlinkTarget,
    /// First component under home is Documents, Desktop, ...
    UserImportantFolder,
    /// Neither under home nor under the applications root
    OutsideUserDirectory,
}

/// Evaluation order. First match wins.
pub const RULE_CHAIN: [Rule; 7] = [
    Rule::Protected,
    Rule::CriticalSystemPath,
    Rule::SystemApplication,
    Rule::PathTraversal,
    Rule::SymlinkTarget,
    Rule::UserImportantFolder,
    Rule::OutsideUserDirectory,
];

/// Everything a rule may look at: fixed roots, the protected set as of the
/// start of the evaluation, and the symlink hops taken so far.
pub struct RuleContext<'a> {
    pub roots: &'a PolicyRoots,
    pub protected: &'a HashSet<OsString>,
    chain: Vec<PathBuf>,
}

impl<'a> RuleContext<'a> {
    pub fn new(roots: &'a PolicyRoots, protected: &'a HashSet<OsString>) -> Self {
        Self {
            roots,
            protected,
            chain: Vec::new(),
        }
    }

    /// Context for validating a symlink target, or `None` if following it
    /// would revisit a path or exceed the hop limit.
    fn follow(&self, from: &Path, target: &Path) -> Option<RuleContext<'a>> {
        if self.chain.len() >= MAX_SYMLINK_DEPTH
            || target == from
            || self.chain.iter().any(|p| p == target)
        {
            return None;
        }
        let mut chain = self.chain.clone();
        chain.push(from.to_path_buf());
        Some(RuleContext {
            roots: self.roots,
            protected: self.protected,
            chain,
        })
    }
}

impl Rule {
    pub fn check(&self, ctx: &RuleContext<'_>, path: &Path) -> Option<ValidationOutcome> {
        match self {
            Rule::Protected => ctx
                .protected
                .contains(path.as_os_str())
                .then(|| ValidationOutcome::Unsafe(REASON_PROTECTED.into())),

            Rule::CriticalSystemPath => ctx
                .roots
                .critical_roots
                .iter()
                .any(|root| path.starts_with(root))
                .then(|| ValidationOutcome::Unsafe(REASON_CRITICAL.into())),

            Rule::SystemApplication => ctx
                .roots
                .system_apps
                .iter()
                .any(|app| app == path)
                .then(|| ValidationOutcome::Warning(REASON_SYSTEM_APP.into())),

            Rule::PathTraversal => path
                .components()
                .any(|c| c == Component::ParentDir)
                .then(|| ValidationOutcome::Unsafe(REASON_TRAVERSAL.into())),

            Rule::SymlinkTarget => check_symlink(ctx, path),

            Rule::UserImportantFolder => {
                let first = path
                    .strip_prefix(&ctx.roots.home)
                    .ok()?
                    .components()
                    .next()?;
                let name = first.as_os_str().to_string_lossy();
                ctx.roots
                    .user_folders
                    .iter()
                    .any(|f| *f == name)
                    .then(|| ValidationOutcome::Warning(REASON_USER_FOLDER.into()))
            }

            Rule::OutsideUserDirectory => (!path.starts_with(&ctx.roots.home)
                && !path.starts_with(&ctx.roots.applications))
            .then(|| ValidationOutcome::Warning(REASON_OUTSIDE_HOME.into())),
        }
    }
}

fn check_symlink(ctx: &RuleContext<'_>, path: &Path) -> Option<ValidationOutcome> {
    let is_link = std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if !is_link {
        return None;
    }

    let raw = match std::fs::read_link(path) {
        Ok(t) => t,
        Err(e) => {
            tracing::debug!("Could not read symlink {}: {}", path.display(), e);
            return None;
        }
    };
    let target = resolve_link_target(path, &raw);
    tracing::info!("Symlink detected: {} -> {}", path.display(), target.display());

    let Some(next) = ctx.follow(path, &target) else {
        tracing::warn!("Symlink loop or overlong chain at {}", path.display());
        return Some(ValidationOutcome::Unsafe(REASON_SYMLINK_LOOP.into()));
    };

    match evaluate(&next, &target) {
        ValidationOutcome::Unsafe(_) => Some(ValidationOutcome::Unsafe(REASON_SYMLINK.into())),
        _ => None,
    }
}

/// Absolute, lexically normalized target of a link at `link`
fn resolve_link_target(link: &Path, raw: &Path) -> PathBuf {
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        link.parent().unwrap_or(Path::new("/")).join(raw)
    };
    normalize_lexically(&joined)
}

/// Collapse `.` and `..` without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Run the chain against `path`
pub fn evaluate(ctx: &RuleContext<'_>, path: &Path) -> ValidationOutcome {
    for rule in RULE_CHAIN {
        if let Some(outcome) = rule.check(ctx, path) {
            tracing::debug!("{} -> {:?} ({:?})", path.display(), outcome, rule);
            return outcome;
        }
    }
    ValidationOutcome::Safe
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots() -> PolicyRoots {
        PolicyRoots::for_home("/Users/test")
    }

    #[test]
    fn test_chain_order() {
        assert_eq!(RULE_CHAIN[0], Rule::Protected);
        assert_eq!(RULE_CHAIN[RULE_CHAIN.len() - 1], Rule::OutsideUserDirectory);
        let traversal = RULE_CHAIN.iter().position(|r| *r == Rule::PathTraversal);
        let symlink = RULE_CHAIN.iter().position(|r| *r == Rule::SymlinkTarget);
        assert!(traversal < symlink);
    }

    #[test]
    fn test_each_rule_fires_in_isolation() {
        let roots = roots();
        let mut protected = HashSet::new();
        protected.insert(OsString::from("/Users/test/keep"));
        let ctx = RuleContext::new(&roots, &protected);

        let cases: [(Rule, &str, bool); 7] = [
            (Rule::Protected, "/Users/test/keep", true),
            (Rule::CriticalSystemPath, "/System/Library/x", true),
            (Rule::SystemApplication, "/Applications/Safari.app", true),
            (Rule::PathTraversal, "/Users/test/a/../b", true),
            (Rule::SymlinkTarget, "/Users/test/not-a-link", false),
            (Rule::UserImportantFolder, "/Users/test/Desktop/x", true),
            (Rule::OutsideUserDirectory, "/opt/thing", true),
        ];
        for (rule, path, fires) in cases {
            assert_eq!(
                rule.check(&ctx, Path::new(path)).is_some(),
                fires,
                "{:?} on {}",
                rule,
                path
            );
        }
    }

    #[test]
    fn test_critical_before_system_app() {
        let mut roots = roots();
        roots.system_apps.push(PathBuf::from("/System/Applications/Mail.app"));
        let protected = HashSet::new();
        let ctx = RuleContext::new(&roots, &protected);
        assert_eq!(
            evaluate(&ctx, Path::new("/System/Applications/Mail.app")),
            ValidationOutcome::Unsafe(REASON_CRITICAL.into())
        );
    }

    #[test]
    fn test_user_folder_requires_home_prefix() {
        let roots = roots();
        let protected = HashSet::new();
        let ctx = RuleContext::new(&roots, &protected);
        assert!(Rule::UserImportantFolder
            .check(&ctx, Path::new("/Volumes/ext/Documents"))
            .is_none());
        assert!(Rule::UserImportantFolder
            .check(&ctx, Path::new("/Users/test/Library/Documents"))
            .is_none());
    }

    #[test]
    fn test_home_prefix_is_component_wise() {
        let roots = roots();
        let protected = HashSet::new();
        let ctx = RuleContext::new(&roots, &protected);
        assert_eq!(
            evaluate(&ctx, Path::new("/Users/tester/file")),
            ValidationOutcome::Warning(REASON_OUTSIDE_HOME.into())
        );
    }

    #[test]
    fn test_protected_match_is_exact_string() {
        let roots = roots();
        let mut protected = HashSet::new();
        protected.insert(OsString::from("/Users/test/keep"));
        let ctx = RuleContext::new(&roots, &protected);
        assert!(Rule::Protected.check(&ctx, Path::new("/Users/test/keep")).is_some());
        assert!(Rule::Protected.check(&ctx, Path::new("/Users/test/keep/")).is_none());
        assert!(Rule::Protected.check(&ctx, Path::new("/Users/test//keep")).is_none());
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(normalize_lexically(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize_lexically(Path::new("/../x")), PathBuf::from("/x"));
    }
}
