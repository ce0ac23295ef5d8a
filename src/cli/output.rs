use colored::*;
use std::path::PathBuf;

use crate::cleaner::{CandidateItem, CategoryScanResult, CleanOutcome, ScanReport};
use crate::common::errors::ScanError;
use crate::common::format::{self, format_path, format_size, format_size_colored};
use crate::common::permissions;
use crate::policy::ValidationOutcome;
use crate::scanner::targets::{Category, CategoryTable};

const MAX_DETAILED_ITEMS: usize = 15;

// ─── Categories ───────────────────────────────────────────────────────────────

pub fn print_categories(table: &CategoryTable, detailed: bool) {
    format::print_header("Cleanup categories");
    for category in Category::ALL {
        let roots = table.paths(category);
        let existing = roots.iter().filter(|p| p.exists()).count();
        let unreadable = permissions::unreadable_roots(roots);
        println!(
            "  {:<18} {:<20} {}",
            category.id().cyan(),
            category.to_string().bold(),
            format!("{}/{} locations present", existing, roots.len()).dimmed()
        );
        println!("  {:<18} {}", "", category.description().dimmed());
        if detailed {
            for root in roots {
                let marker = if unreadable.contains(&root.as_path()) {
                    "●".red()
                } else if root.exists() {
                    "●".green()
                } else {
                    "○".dimmed()
                };
                println!("  {:<18}   {} {}", "", marker, format_path(root));
            }
        }
    }
    println!();
}

pub fn print_categories_json(table: &CategoryTable) -> anyhow::Result<()> {
    let json: Vec<_> = Category::ALL
        .iter()
        .map(|c| {
            serde_json::json!({
                "id": c.id(),
                "name": c.to_string(),
                "description": c.description(),
                "roots": table.paths(*c),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

/// Print scan results in human-readable format
pub fn print_scan_report(report: &ScanReport, detailed: bool) {
    println!();
    println!("{}  Mole Scan Results", "🧹");
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "  Scanned in {}  •  {} reclaimable  •  {}",
        format::format_duration(report.duration_secs).cyan(),
        format_size_colored(report.total_size()),
        format::format_count(report.item_count()).dimmed()
    );
    println!("{}", "─".repeat(60).dimmed());
    println!();

    if report.item_count() == 0 {
        println!("  {} Nothing to clean!", "✨");
        return;
    }

    for result in report.results.values() {
        print_category_result(result, detailed);
    }

    let errors: Vec<_> = report.results.values().flat_map(|r| r.errors.iter()).collect();
    if !errors.is_empty() {
        println!(
            "  {} {}",
            "⚠".yellow(),
            format!("{} locations could not be scanned:", errors.len()).yellow()
        );
        for error in errors {
            println!("    {} {}", "→".dimmed(), error.to_string().dimmed());
            let hint = match error {
                ScanError::PermissionDenied(p) => permissions::permission_hint(p),
                other => other.hint().to_string(),
            };
            println!("      {}", hint.dimmed());
        }
        println!();
    }

    println!("{}", "─".repeat(60).dimmed());
    println!(
        "  {} Total reclaimable: {}",
        "💾",
        format_size_colored(report.total_size()).bold()
    );
    println!("  Run {} to remove these items.", "mole clean".cyan());
    println!();
}

fn print_category_result(result: &CategoryScanResult, detailed: bool) {
    if result.is_empty() {
        println!(
            "  {} {:<22} {}",
            "○".dimmed(),
            result.category.to_string().dimmed(),
            "nothing found".dimmed()
        );
        return;
    }

    println!(
        "  {} {:<22} {:>10}  {}",
        "●".green(),
        result.category.to_string().bold(),
        format_size_colored(result.total_size()),
        format::format_count(result.item_count()).dimmed()
    );

    if detailed {
        let mut items: Vec<&CandidateItem> = result.items.iter().collect();
        items.sort_by(|a, b| b.size().cmp(&a.size()));
        for item in items.iter().take(MAX_DETAILED_ITEMS) {
            let kind = if item.is_dir() { "dir " } else { "file" };
            println!(
                "      {} {:>10}  {}  {}",
                kind.dimmed(),
                format_size(item.size()),
                format::format_modified(item.entry.modified).dimmed(),
                format::truncate(&format_path(item.path()), 60)
            );
        }
        if items.len() > MAX_DETAILED_ITEMS {
            println!(
                "      {}",
                format!("… and {} more", items.len() - MAX_DETAILED_ITEMS).dimmed()
            );
        }
    }
}

/// Print scan results as JSON
pub fn print_scan_json(report: &ScanReport) -> anyhow::Result<()> {
    let categories: Vec<_> = report
        .results
        .values()
        .map(|r| {
            serde_json::json!({
                "category": r.category,
                "total_size": r.total_size(),
                "item_count": r.item_count(),
                "items": r.items,
                "errors": r.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            })
        })
        .collect();
    let json = serde_json::json!({
        "scanned_at": report.scanned_at,
        "duration_secs": report.duration_secs,
        "total_reclaimable": report.total_size(),
        "total_items": report.item_count(),
        "categories": categories,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// One line per category: id, bytes, count
pub fn print_scan_quiet(report: &ScanReport) {
    for result in report.results.values() {
        println!("{}\t{}\t{}", result.category.id(), result.total_size(), result.item_count());
    }
}

// ─── Estimate ─────────────────────────────────────────────────────────────────

pub fn print_estimates(estimates: &[(Category, u64)]) {
    format::print_header("Estimated category sizes");
    let total: u64 = estimates.iter().map(|(_, s)| s).sum();
    for (category, size) in estimates {
        println!("  {:<22} {:>12}", category.to_string(), format_size_colored(*size));
    }
    println!("  {}", "─".repeat(35).dimmed());
    println!("  {:<22} {:>12}", "Total".bold(), format_size_colored(total).bold());
    println!();
}

// ─── Clean ────────────────────────────────────────────────────────────────────

/// List candidates that will be deleted despite a policy warning
pub fn print_warnings(warnings: &[(&CandidateItem, ValidationOutcome)]) {
    if warnings.is_empty() {
        return;
    }
    println!(
        "  {} {}",
        "⚠".yellow(),
        format!("{} items need a second look:", warnings.len()).yellow().bold()
    );
    for (item, outcome) in warnings {
        println!(
            "    {} {}  {}",
            "→".dimmed(),
            format_path(item.path()),
            format::format_outcome(outcome)
        );
    }
    println!();
}

pub fn print_clean_outcome(outcome: &CleanOutcome, moved_to_trash: bool) {
    println!();
    if outcome.is_all_succeeded() {
        println!(
            "  {} Cleaned {} — freed {}",
            "✓".green().bold(),
            format::format_count(outcome.succeeded_count()),
            format_size_colored(outcome.freed_bytes()).bold()
        );
    } else {
        println!(
            "  {} Cleaned {} ({} failed) — freed {}",
            "!".yellow().bold(),
            format::format_count(outcome.succeeded_count()),
            outcome.failed_count(),
            format_size_colored(outcome.freed_bytes()).bold()
        );
        for (item, err) in &outcome.failed {
            println!("    {} {}", "✗".red(), format_path(item.path()));
            println!("      {}", err.to_string().dimmed());
        }
    }
    if moved_to_trash && outcome.succeeded_count() > 0 {
        println!("  {} Items were moved to the Trash and can be restored from there.", "ℹ️");
    }
    println!();
}

pub fn print_clean_json(outcome: &CleanOutcome, moved_to_trash: bool) -> anyhow::Result<()> {
    let json = serde_json::json!({
        "moved_to_trash": moved_to_trash,
        "succeeded": outcome.succeeded_count(),
        "failed": outcome.failed_count(),
        "freed_bytes": outcome.freed_bytes(),
        "succeeded_paths": outcome.succeeded.iter().map(|i| i.path()).collect::<Vec<_>>(),
        "failures": outcome.failed.iter().map(|(item, err)| {
            serde_json::json!({
                "path": item.path(),
                "kind": err.kind(),
                "error": err.to_string(),
            })
        }).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

// ─── Validate ─────────────────────────────────────────────────────────────────

pub fn print_validation(results: &[(PathBuf, ValidationOutcome)]) {
    println!();
    for (path, outcome) in results {
        let marker = match outcome {
            ValidationOutcome::Safe => "●".green(),
            ValidationOutcome::Warning(_) => "●".yellow(),
            ValidationOutcome::Unsafe(_) => "●".red(),
        };
        println!("  {} {}  {}", marker, path.display(), format::format_outcome(outcome));
    }
    println!();
}

pub fn print_validation_json(results: &[(PathBuf, ValidationOutcome)]) -> anyhow::Result<()> {
    let json: Vec<_> = results
        .iter()
        .map(|(path, outcome)| serde_json::json!({ "path": path, "result": outcome }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
