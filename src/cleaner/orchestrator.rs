use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::time::Instant;
use uuid::Uuid;

use super::deleter::{Deletable, DeleteOptions, DeleteProgress, Deleter};
use crate::common::errors::{DeleteError, ScanError};
use crate::policy::PathPolicy;
use crate::scanner::targets::{Category, CategoryTable, FileEntry};
use crate::scanner::Scanner;

// ─── Candidates and results ───────────────────────────────────────────────────

/// A scanned entry that passed the safety filter and may be selected for
/// cleanup. `id` is the handle callers use to track selection across the
/// scan and clean steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CandidateItem {
    pub id: Uuid,
    pub category: Category,
    pub entry: FileEntry,
}

impl CandidateItem {
    pub fn new(category: Category, entry: FileEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            category,
            entry,
        }
    }

    pub fn path(&self) -> &Path {
        &self.entry.path
    }

    pub fn size(&self) -> u64 {
        self.entry.size_bytes
    }

    pub fn name(&self) -> String {
        self.entry.name()
    }

    pub fn is_dir(&self) -> bool {
        self.entry.is_dir
    }
}

impl Deletable for CandidateItem {
    fn target_path(&self) -> &Path {
        &self.entry.path
    }
}

/// Candidates found for one category, plus the roots that could not be
/// scanned (recovered, not fatal)
#[derive(Debug)]
pub struct CategoryScanResult {
    pub category: Category,
    pub items: Vec<CandidateItem>,
    pub errors: Vec<ScanError>,
}

impl CategoryScanResult {
    pub fn empty(category: Category) -> Self {
        Self {
            category,
            items: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn total_size(&self) -> u64 {
        self.items.iter().map(CandidateItem::size).sum()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Results of a sweep over every category
#[derive(Debug)]
pub struct ScanReport {
    pub scanned_at: chrono::DateTime<chrono::Utc>,
    pub duration_secs: f64,
    pub results: BTreeMap<Category, CategoryScanResult>,
}

impl ScanReport {
    pub fn new(results: BTreeMap<Category, CategoryScanResult>, duration_secs: f64) -> Self {
        Self {
            scanned_at: chrono::Utc::now(),
            duration_secs,
            results,
        }
    }

    /// Every candidate, in category order. A path reachable from two
    /// categories is listed once, under the first. A candidate nested inside
    /// another candidate is dropped, since removing the outer one removes it.
    pub fn all_items(&self) -> Vec<&CandidateItem> {
        let everything: HashSet<&Path> = self
            .results
            .values()
            .flat_map(|r| r.items.iter().map(CandidateItem::path))
            .collect();
        let mut seen: HashSet<&Path> = HashSet::new();
        self.results
            .values()
            .flat_map(|r| r.items.iter())
            .filter(|item| !item.path().ancestors().skip(1).any(|a| everything.contains(a)))
            .filter(|item| seen.insert(item.path()))
            .collect()
    }

    /// Candidates whose id is in `ids`
    pub fn select(&self, ids: &HashSet<Uuid>) -> Vec<CandidateItem> {
        self.all_items()
            .into_iter()
            .filter(|item| ids.contains(&item.id))
            .cloned()
            .collect()
    }

    pub fn total_size(&self) -> u64 {
        self.all_items().iter().map(|i| i.size()).sum()
    }

    pub fn item_count(&self) -> usize {
        self.all_items().len()
    }

    /// Drop candidates that a clean removed, matching by path
    pub fn forget(&mut self, outcome: &CleanOutcome) {
        let gone: HashSet<&Path> = outcome.succeeded.iter().map(CandidateItem::path).collect();
        for result in self.results.values_mut() {
            result.items.retain(|item| !gone.contains(item.path()));
        }
    }
}

/// Outcome of `clean`, expressed in terms of the caller's candidates
#[derive(Debug, Default)]
pub struct CleanOutcome {
    pub succeeded: Vec<CandidateItem>,
    pub failed: Vec<(CandidateItem, DeleteError)>,
}

impl CleanOutcome {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn freed_bytes(&self) -> u64 {
        self.succeeded.iter().map(CandidateItem::size).sum()
    }

    pub fn is_all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn is_all_failed(&self) -> bool {
        self.succeeded.is_empty()
    }
}

// ─── State machines ───────────────────────────────────────────────────────────

/// Scan lifecycle: `Idle -> Scanning -> Completed | Failed`
#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Idle,
    Scanning { category: Category, progress: f64 },
    Completed,
    Failed(String),
}

/// Clean lifecycle: `Idle -> Cleaning -> Completed | Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanState {
    Idle,
    Cleaning { current: usize, total: usize },
    Completed { succeeded: usize, failed: usize, freed_bytes: u64 },
    Failed(String),
}

impl ScanState {
    pub fn is_active(&self) -> bool {
        matches!(self, ScanState::Scanning { .. })
    }
}

impl CleanState {
    pub fn is_active(&self) -> bool {
        matches!(self, CleanState::Cleaning { .. })
    }
}

fn emit<T>(tx: Option<&Sender<T>>, msg: T) {
    if let Some(tx) = tx {
        let _ = tx.send(msg);
    }
}

// ─── Orchestrator ─────────────────────────────────────────────────────────────

/// Runs category-scoped scans and cleans on top of the scanner, the path
/// policy and the deleter.
#[derive(Debug, Clone)]
pub struct CleanOrchestrator {
    table: CategoryTable,
    scanner: Scanner,
    deleter: Deleter,
}

impl CleanOrchestrator {
    pub fn new(table: CategoryTable, scanner: Scanner, deleter: Deleter) -> Self {
        Self {
            table,
            scanner,
            deleter,
        }
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    pub fn policy(&self) -> &PathPolicy {
        self.deleter.policy()
    }

    pub fn deleter(&self) -> &Deleter {
        &self.deleter
    }

    /// Shallow-scan every existing root of `category` in table order and
    /// keep the entries the policy does not reject.
    pub fn scan_category(&self, category: Category, progress: Option<&Sender<ScanState>>) -> CategoryScanResult {
        let result = self.scan_category_span(category, progress, 0.0, 1.0);

        let existing = self.table.paths(category).iter().filter(|p| p.exists()).count();
        if existing > 0 && result.errors.len() == existing {
            emit(progress, ScanState::Failed(format!("No {} location could be scanned", category)));
        } else {
            emit(progress, ScanState::Completed);
        }
        result
    }

    /// Progress for this category is mapped onto `[base, base + span]`
    fn scan_category_span(
        &self,
        category: Category,
        progress: Option<&Sender<ScanState>>,
        base: f64,
        span: f64,
    ) -> CategoryScanResult {
        let roots = self.table.paths(category);
        tracing::info!("Scanning category: {} ({} paths)", category.id(), roots.len());

        let mut result = CategoryScanResult::empty(category);
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let total = roots.len().max(1) as f64;

        for (index, root) in roots.iter().enumerate() {
            emit(
                progress,
                ScanState::Scanning {
                    category,
                    progress: base + span * (index as f64 / total),
                },
            );

            if !root.exists() {
                tracing::debug!("Path not found, skipping: {}", root.display());
                continue;
            }

            let entries = match self.scanner.scan(root, false, None) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Failed to scan {}: {}", root.display(), e);
                    result.errors.push(e);
                    continue;
                }
            };

            let before = result.items.len();
            let paths: Vec<&Path> = entries.iter().map(|e| e.path.as_path()).collect();
            let verdicts = self.policy().validate_batch(&paths);

            for entry in entries {
                if self.table.is_default_protected(&entry.path) {
                    tracing::debug!("Default-protected, skipping: {}", entry.path.display());
                    continue;
                }
                if verdicts.get(&entry.path).is_some_and(|v| v.is_unsafe()) {
                    tracing::debug!("Rejected by policy, skipping: {}", entry.path.display());
                    continue;
                }
                if !seen.insert(entry.path.clone()) {
                    continue;
                }
                result.items.push(CandidateItem::new(category, entry));
            }

            tracing::info!("Scanned {}: {} items", root.display(), result.items.len() - before);
        }

        emit(
            progress,
            ScanState::Scanning {
                category,
                progress: base + span,
            },
        );
        result
    }

    /// Scan every category in enumeration order. One category's problems
    /// never abort the sweep.
    pub fn scan_all_categories(&self, progress: Option<&Sender<ScanState>>) -> ScanReport {
        tracing::info!("Starting full scan of all categories");
        let start = Instant::now();
        let span = 1.0 / Category::ALL.len() as f64;

        let mut results = BTreeMap::new();
        for (index, category) in Category::ALL.into_iter().enumerate() {
            let result = self.scan_category_span(category, progress, index as f64 * span, span);
            tracing::info!(
                "Category {}: {} items, {} bytes",
                category.id(),
                result.item_count(),
                result.total_size()
            );
            results.insert(category, result);
        }
        emit(progress, ScanState::Completed);

        let report = ScanReport::new(results, start.elapsed().as_secs_f64());
        tracing::info!(
            "Full scan complete: {} items across {} categories",
            report.item_count(),
            report.results.len()
        );
        report
    }

    /// Scan only the given categories, in enumeration order
    pub fn scan_categories(&self, categories: &[Category], progress: Option<&Sender<ScanState>>) -> ScanReport {
        let mut wanted: Vec<Category> = categories.to_vec();
        wanted.sort();
        wanted.dedup();
        if wanted.is_empty() || wanted.len() == Category::ALL.len() {
            return self.scan_all_categories(progress);
        }
        let start = Instant::now();
        let span = 1.0 / wanted.len() as f64;

        let results = wanted
            .iter()
            .enumerate()
            .map(|(index, c)| (*c, self.scan_category_span(*c, progress, index as f64 * span, span)))
            .collect();
        emit(progress, ScanState::Completed);
        ScanReport::new(results, start.elapsed().as_secs_f64())
    }

    /// Delete the given candidates and map the per-path results back onto
    /// them. Failures never abort; each lands in `failed` with its error.
    pub fn clean(
        &self,
        candidates: &[CandidateItem],
        move_to_trash: bool,
        progress: Option<&Sender<CleanState>>,
    ) -> CleanOutcome {
        tracing::info!("Cleaning {} items (move_to_trash={})", candidates.len(), move_to_trash);

        let options = DeleteOptions {
            move_to_trash,
            skip_validation: false,
            continue_on_error: true,
        };

        let batch = std::thread::scope(|s| {
            let (tx, rx) = mpsc::channel::<DeleteProgress>();
            if let Some(out) = progress {
                s.spawn(move || {
                    for p in rx {
                        let _ = out.send(CleanState::Cleaning {
                            current: p.current,
                            total: p.total,
                        });
                    }
                });
            }
            self.deleter.delete_items(candidates, &options, Some(&tx))
        });

        let batch = match batch {
            Ok(b) => b,
            // continue_on_error is set, so the batch cannot abort
            Err(e) => {
                tracing::error!("Batch delete aborted unexpectedly: {}", e);
                emit(progress, CleanState::Failed(e.to_string()));
                return CleanOutcome::default();
            }
        };

        let mut failed_by_path: HashMap<PathBuf, DeleteError> = batch.failed.into_iter().collect();
        let mut outcome = CleanOutcome::default();
        for item in candidates {
            if batch.succeeded.contains(item.path()) {
                outcome.succeeded.push(item.clone());
            } else if let Some(err) = failed_by_path.remove(item.path()) {
                outcome.failed.push((item.clone(), err));
            }
        }

        tracing::info!(
            "Clean complete: {} succeeded, {} failed, freed {} bytes",
            outcome.succeeded_count(),
            outcome.failed_count(),
            outcome.freed_bytes()
        );
        emit(
            progress,
            CleanState::Completed {
                succeeded: outcome.succeeded_count(),
                failed: outcome.failed_count(),
                freed_bytes: outcome.freed_bytes(),
            },
        );
        outcome
    }

    /// On-disk size of every existing root of `category`, independent of
    /// any scan
    pub fn estimate_category_size(&self, category: Category) -> u64 {
        self.table
            .paths(category)
            .iter()
            .filter(|p| p.exists())
            .filter_map(|p| match self.scanner.total_size(p) {
                Ok(size) => Some(size),
                Err(e) => {
                    tracing::warn!("Could not size {}: {}", p.display(), e);
                    None
                }
            })
            .sum()
    }
}
