use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use tempfile::TempDir;

use mole::cleaner::{CleanOrchestrator, CleanState, Deleter, ScanState, TrashBin};
use mole::policy::{PathPolicy, PolicyRoots};
use mole::scanner::targets::{Category, CategoryTable};
use mole::scanner::Scanner;

fn write(path: &Path, bytes: usize) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, vec![b'x'; bytes]).unwrap();
}

fn orchestrator(home: &Path, table: CategoryTable) -> CleanOrchestrator {
    let policy = Arc::new(PathPolicy::with_roots(PolicyRoots::for_home(home)));
    let deleter = Deleter::new(policy).with_trash(TrashBin::at(home.join("trash")));
    CleanOrchestrator::new(table, Scanner::new().with_directory_sizes(true), deleter)
}

/// home/Library/Caches with three files of 10, 20 and 30 bytes
fn cache_fixture() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let caches = tmp.path().join("Library/Caches");
    write(&caches.join("one"), 10);
    write(&caches.join("two"), 20);
    write(&caches.join("three"), 30);
    (tmp, caches)
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

#[test]
fn test_scan_and_clean_end_to_end() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty().with_roots(Category::UserCaches, vec![caches.clone()]);
    let orch = orchestrator(tmp.path(), table);

    let result = orch.scan_category(Category::UserCaches, None);
    assert_eq!(result.item_count(), 3);
    assert_eq!(result.total_size(), 60);
    assert!(result.errors.is_empty());
    assert!(result.items.iter().all(|i| i.category == Category::UserCaches));

    let outcome = orch.clean(&result.items, true, None);
    assert_eq!(outcome.succeeded_count(), 3);
    assert_eq!(outcome.failed_count(), 0);
    assert_eq!(outcome.freed_bytes(), 60);

    assert_eq!(std::fs::read_dir(&caches).unwrap().count(), 0);
    assert_eq!(std::fs::read_dir(tmp.path().join("trash")).unwrap().count(), 3);
}

#[test]
fn test_candidate_ids_are_unique() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty().with_roots(Category::UserCaches, vec![caches]);
    let orch = orchestrator(tmp.path(), table);

    let result = orch.scan_category(Category::UserCaches, None);
    let ids: HashSet<_> = result.items.iter().map(|i| i.id).collect();
    assert_eq!(ids.len(), result.items.len());
}

#[test]
fn test_scan_is_shallow() {
    let tmp = TempDir::new().unwrap();
    let caches = tmp.path().join("Library/Caches");
    write(&caches.join("app/nested/blob"), 50);
    write(&caches.join("top"), 5);
    let table = CategoryTable::empty().with_roots(Category::UserCaches, vec![caches]);
    let orch = orchestrator(tmp.path(), table);

    let result = orch.scan_category(Category::UserCaches, None);
    let names: HashSet<String> = result.items.iter().map(|i| i.name()).collect();
    assert_eq!(names, ["app", "top"].iter().map(|s| s.to_string()).collect());

    let app = result.items.iter().find(|i| i.name() == "app").unwrap();
    assert!(app.is_dir());
    assert_eq!(app.size(), 50);
}

#[test]
fn test_default_protected_prefix_excluded() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty()
        .with_roots(Category::UserCaches, vec![caches.clone()])
        .with_protected_prefix(caches.join("two"));
    let orch = orchestrator(tmp.path(), table);

    let result = orch.scan_category(Category::UserCaches, None);
    assert_eq!(result.item_count(), 2);
    assert!(result.items.iter().all(|i| i.path() != caches.join("two")));
}

#[test]
fn test_protected_path_excluded() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty().with_roots(Category::UserCaches, vec![caches.clone()]);
    let orch = orchestrator(tmp.path(), table);
    orch.policy().protect(caches.join("three"));

    let result = orch.scan_category(Category::UserCaches, None);
    assert_eq!(result.item_count(), 2);
    assert_eq!(result.total_size(), 30);
}

#[test]
fn test_missing_root_is_skipped() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty()
        .with_roots(Category::UserCaches, vec![tmp.path().join("absent"), caches]);
    let orch = orchestrator(tmp.path(), table);

    let result = orch.scan_category(Category::UserCaches, None);
    assert_eq!(result.item_count(), 3);
    assert!(result.errors.is_empty());
}

#[test]
fn test_category_without_roots_is_empty() {
    let tmp = TempDir::new().unwrap();
    let orch = orchestrator(tmp.path(), CategoryTable::empty());
    let result = orch.scan_category(Category::TempFiles, None);
    assert!(result.is_empty());
    assert!(result.errors.is_empty());
}

#[test]
fn test_overlapping_roots_yield_each_path_once() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty().with_roots(Category::UserCaches, vec![caches.clone(), caches]);
    let orch = orchestrator(tmp.path(), table);
    assert_eq!(orch.scan_category(Category::UserCaches, None).item_count(), 3);
}

#[test]
fn test_scan_state_messages() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty().with_roots(Category::UserCaches, vec![caches]);
    let orch = orchestrator(tmp.path(), table);

    let (tx, rx) = mpsc::channel();
    orch.scan_category(Category::UserCaches, Some(&tx));
    drop(tx);
    let states: Vec<ScanState> = rx.iter().collect();

    assert!(states.first().unwrap().is_active());
    assert_eq!(states.last().unwrap(), &ScanState::Completed);
    let fractions: Vec<f64> = states
        .iter()
        .filter_map(|s| match s {
            ScanState::Scanning { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*fractions.last().unwrap(), 1.0);
}

// ─── Full sweep ───────────────────────────────────────────────────────────────

#[test]
fn test_scan_all_categories_covers_every_category() {
    let (tmp, caches) = cache_fixture();
    let logs = tmp.path().join("Library/Logs");
    write(&logs.join("app.log"), 7);
    let table = CategoryTable::empty()
        .with_roots(Category::UserCaches, vec![caches])
        .with_roots(Category::UserLogs, vec![logs]);
    let orch = orchestrator(tmp.path(), table);

    let report = orch.scan_all_categories(None);
    assert_eq!(report.results.len(), Category::ALL.len());
    assert_eq!(report.results[&Category::UserCaches].item_count(), 3);
    assert_eq!(report.results[&Category::UserLogs].total_size(), 7);
    assert_eq!(report.item_count(), 4);
    assert_eq!(report.total_size(), 67);
}

#[test]
fn test_scan_categories_subset() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty()
        .with_roots(Category::UserCaches, vec![caches.clone()])
        .with_roots(Category::TempFiles, vec![caches]);
    let orch = orchestrator(tmp.path(), table);

    let report = orch.scan_categories(&[Category::TempFiles], None);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[&Category::TempFiles].item_count(), 3);
}

#[test]
fn test_report_dedupes_paths_across_categories() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty()
        .with_roots(Category::UserCaches, vec![caches.clone()])
        .with_roots(Category::TempFiles, vec![caches]);
    let orch = orchestrator(tmp.path(), table);

    let report = orch.scan_all_categories(None);
    assert_eq!(report.item_count(), 3);
    assert!(report.all_items().iter().all(|i| i.category == Category::UserCaches));
}

#[test]
fn test_nested_category_roots_are_cleaned_once() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("Library/Caches/Google/Chrome/blob"), 100);
    let orch = orchestrator(tmp.path(), CategoryTable::for_home(tmp.path()));

    let report = orch.scan_all_categories(None);
    assert_eq!(report.results[&Category::BrowserCaches].item_count(), 1);
    let items = report.all_items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].path(), tmp.path().join("Library/Caches/Google"));
    assert_eq!(report.total_size(), 100);

    let candidates: Vec<_> = items.into_iter().cloned().collect();
    let outcome = orch.clean(&candidates, false, None);
    assert_eq!(outcome.succeeded_count(), 1);
    assert_eq!(outcome.failed_count(), 0);
    assert_eq!(outcome.freed_bytes(), 100);
    assert!(!tmp.path().join("Library/Caches/Google").exists());
}

#[test]
fn test_repeated_category_scans_only_that_category() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty().with_roots(Category::UserCaches, vec![caches]);
    let orch = orchestrator(tmp.path(), table);

    let repeated = vec![Category::UserLogs; Category::ALL.len()];
    let report = orch.scan_categories(&repeated, None);
    assert_eq!(report.results.len(), 1);
    assert!(report.results.contains_key(&Category::UserLogs));
    assert_eq!(report.item_count(), 0);
}

#[test]
fn test_select_and_forget() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty().with_roots(Category::UserCaches, vec![caches.clone()]);
    let orch = orchestrator(tmp.path(), table);

    let mut report = orch.scan_all_categories(None);
    let chosen: HashSet<_> = report
        .all_items()
        .iter()
        .filter(|i| i.name() != "two")
        .map(|i| i.id)
        .collect();
    let selected = report.select(&chosen);
    assert_eq!(selected.len(), 2);

    let outcome = orch.clean(&selected, false, None);
    assert_eq!(outcome.freed_bytes(), 40);
    report.forget(&outcome);

    assert_eq!(report.item_count(), 1);
    assert_eq!(report.all_items()[0].path(), caches.join("two"));
    assert!(caches.join("two").exists());
}

// ─── Clean ────────────────────────────────────────────────────────────────────

#[test]
fn test_clean_reports_failures_per_candidate() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty().with_roots(Category::UserCaches, vec![caches.clone()]);
    let orch = orchestrator(tmp.path(), table);

    let result = orch.scan_category(Category::UserCaches, None);
    std::fs::remove_file(caches.join("one")).unwrap();

    let outcome = orch.clean(&result.items, false, None);
    assert_eq!(outcome.succeeded_count(), 2);
    assert_eq!(outcome.failed_count(), 1);
    assert_eq!(outcome.failed[0].0.path(), caches.join("one"));
    assert_eq!(outcome.freed_bytes(), 50);
}

#[test]
fn test_clean_rechecks_policy() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty().with_roots(Category::UserCaches, vec![caches.clone()]);
    let orch = orchestrator(tmp.path(), table);

    let result = orch.scan_category(Category::UserCaches, None);
    orch.policy().protect(caches.join("one"));

    let outcome = orch.clean(&result.items, false, None);
    assert_eq!(outcome.failed_count(), 1);
    assert!(caches.join("one").exists());
}

#[test]
fn test_clean_state_messages() {
    let (tmp, caches) = cache_fixture();
    let table = CategoryTable::empty().with_roots(Category::UserCaches, vec![caches]);
    let orch = orchestrator(tmp.path(), table);
    let result = orch.scan_category(Category::UserCaches, None);

    let (tx, rx) = mpsc::channel();
    orch.clean(&result.items, true, Some(&tx));
    drop(tx);
    let states: Vec<CleanState> = rx.iter().collect();

    let cleaning: Vec<usize> = states
        .iter()
        .filter_map(|s| match s {
            CleanState::Cleaning { current, total } => {
                assert_eq!(*total, 3);
                Some(*current)
            }
            _ => None,
        })
        .collect();
    assert_eq!(cleaning, vec![1, 2, 3]);
    assert_eq!(
        states.last().unwrap(),
        &CleanState::Completed {
            succeeded: 3,
            failed: 0,
            freed_bytes: 60
        }
    );
}

#[test]
fn test_cleaning_the_trash_empties_it() {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join(".Trash/old.bin"), 50);
    let policy = Arc::new(PathPolicy::with_roots(PolicyRoots::for_home(tmp.path())));
    let deleter = Deleter::new(policy).with_trash(TrashBin::at(tmp.path().join(".Trash")));
    let orch = CleanOrchestrator::new(CategoryTable::for_home(tmp.path()), Scanner::new(), deleter);

    let result = orch.scan_category(Category::Trash, None);
    assert_eq!(result.item_count(), 1);

    let outcome = orch.clean(&result.items, true, None);
    assert_eq!(outcome.succeeded_count(), 1);
    assert_eq!(outcome.freed_bytes(), 50);
    assert_eq!(std::fs::read_dir(tmp.path().join(".Trash")).unwrap().count(), 0);
}

#[test]
fn test_clean_nothing() {
    let tmp = TempDir::new().unwrap();
    let orch = orchestrator(tmp.path(), CategoryTable::empty());
    let outcome = orch.clean(&[], true, None);
    assert!(outcome.is_all_succeeded());
    assert_eq!(outcome.freed_bytes(), 0);
}

// ─── Estimate ─────────────────────────────────────────────────────────────────

#[test]
fn test_estimate_category_size() {
    let (tmp, caches) = cache_fixture();
    write(&caches.join("deep/nested/file"), 40);
    let table = CategoryTable::empty()
        .with_roots(Category::UserCaches, vec![caches, tmp.path().join("absent")]);
    let orch = orchestrator(tmp.path(), table);

    assert_eq!(orch.estimate_category_size(Category::UserCaches), 100);
    assert_eq!(orch.estimate_category_size(Category::Trash), 0);
}
