use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use mole::cleaner::{CandidateItem, CleanOrchestrator, CleanOutcome, CleanState, Deleter, ScanReport, ScanState, TrashBin};
use mole::cli::args::{Cli, Commands, CompletionShell, ConfigAction, OutputFormat, ProtectAction};
use mole::cli::output;
use mole::common::config::{expand_tilde, Config};
use mole::common::{format, logging, permissions};
use mole::policy::{PathPolicy, ValidationOutcome};
use mole::scanner::targets::{Category, CategoryTable};
use mole::scanner::Scanner;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // A broken config file must not block `mole config reset`
    let loaded = Config::load();
    let log_to_file = loaded.as_ref().map(|c| c.log_to_file).unwrap_or(false);
    let _log_guard = logging::init(cli.verbose, log_to_file)?;

    if let Commands::Config { ref action } = cli.command {
        return cmd_config(action);
    }

    let config = loaded?;
    let out = if let Some(f) = cli.format {
        f
    } else if cli.quiet {
        OutputFormat::Quiet
    } else {
        OutputFormat::from(&config.output_format)
    };

    match cli.command {
        Commands::Categories { detailed } => cmd_categories(&config, out, detailed),
        Commands::Scan { ref categories, detailed } => cmd_scan(&config, out, categories, detailed),
        Commands::Estimate { ref categories } => cmd_estimate(&config, out, categories),
        Commands::Clean {
            ref categories,
            permanent,
            yes,
            dry_run,
        } => cmd_clean(&config, out, categories, permanent, yes, dry_run),
        Commands::Validate { ref paths } => cmd_validate(&config, out, paths),
        Commands::Protect { ref action } => cmd_protect(config, out, action),
        Commands::Completions { ref shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            let shell = match shell {
                CompletionShell::Bash => clap_complete::Shell::Bash,
                CompletionShell::Zsh => clap_complete::Shell::Zsh,
                CompletionShell::Fish => clap_complete::Shell::Fish,
            };
            clap_complete::generate(shell, &mut cmd, "mole", &mut std::io::stdout());
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}

/// Wire the policy, deleter, scanner and category table from config
fn build_orchestrator(config: &Config) -> CleanOrchestrator {
    let policy = Arc::new(PathPolicy::new());
    for path in config.expanded_protected_paths() {
        policy.protect(path);
    }

    let mut deleter = Deleter::new(Arc::clone(&policy));
    if let Some(dir) = &config.trash_dir {
        deleter = deleter.with_trash(TrashBin::at(expand_tilde(&dir.to_string_lossy())));
    }

    let scanner = Scanner::new()
        .with_progress_interval(config.progress_interval)
        .with_directory_sizes(config.measure_directories);

    let mut table = CategoryTable::for_current_user();
    for unknown in table.extend_from_config(&config.extra_roots) {
        tracing::warn!("Ignoring extra roots for unknown category '{}'", unknown);
    }

    CleanOrchestrator::new(table, scanner, deleter)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("\n  {} {} [y/N] ", "❓", prompt);
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn progress_bar(len: u64, template: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .context("Invalid progress template")?
            .progress_chars("━━░"),
    );
    Ok(pb)
}

/// Scan on a worker thread while this thread drives the progress bar
fn run_scan(orchestrator: &CleanOrchestrator, categories: &[Category], show_progress: bool) -> Result<ScanReport> {
    if !show_progress {
        return Ok(orchestrator.scan_categories(categories, None));
    }

    let pb = progress_bar(1000, "{spinner:.cyan} [{bar:40.cyan/blue}] {percent:>3}% Scanning {msg}")?;
    let report = std::thread::scope(|s| {
        let (tx, rx) = mpsc::channel::<ScanState>();
        let worker = s.spawn(move || orchestrator.scan_categories(categories, Some(&tx)));
        for state in rx {
            match state {
                ScanState::Scanning { category, progress } => {
                    pb.set_position((progress * 1000.0) as u64);
                    pb.set_message(category.to_string());
                }
                ScanState::Failed(reason) => pb.println(format!("  {} {}", "⚠".yellow(), reason)),
                ScanState::Idle | ScanState::Completed => {}
            }
        }
        worker.join()
    });
    pb.finish_and_clear();

    report.map_err(|_| anyhow::anyhow!("Scan worker panicked"))
}

fn run_clean(
    orchestrator: &CleanOrchestrator,
    candidates: &[CandidateItem],
    move_to_trash: bool,
    show_progress: bool,
) -> Result<CleanOutcome> {
    if !show_progress {
        return Ok(orchestrator.clean(candidates, move_to_trash, None));
    }

    let label = if move_to_trash { "Moving to Trash..." } else { "Deleting..." };
    let pb = progress_bar(
        candidates.len() as u64,
        &format!("{{spinner:.green}} [{{bar:40.green/blue}}] {{pos}}/{{len}} {}", label),
    )?;
    let outcome = std::thread::scope(|s| {
        let (tx, rx) = mpsc::channel::<CleanState>();
        let worker = s.spawn(move || orchestrator.clean(candidates, move_to_trash, Some(&tx)));
        for state in rx {
            if let CleanState::Cleaning { current, .. } = state {
                pb.set_position(current as u64);
            }
        }
        worker.join()
    });
    pb.finish_and_clear();

    outcome.map_err(|_| anyhow::anyhow!("Clean worker panicked"))
}

// ─── Categories ───────────────────────────────────────────────────────────────

fn cmd_categories(config: &Config, out: OutputFormat, detailed: bool) -> Result<()> {
    let orchestrator = build_orchestrator(config);
    match out {
        OutputFormat::Human => output::print_categories(orchestrator.table(), detailed),
        OutputFormat::Json => output::print_categories_json(orchestrator.table())?,
        OutputFormat::Quiet => {
            for category in Category::ALL {
                println!("{}", category.id());
            }
        }
    }
    Ok(())
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

fn cmd_scan(config: &Config, out: OutputFormat, categories: &[Category], detailed: bool) -> Result<()> {
    let orchestrator = build_orchestrator(config);
    let human = out == OutputFormat::Human;

    if human && cfg!(target_os = "macos") && !permissions::has_full_disk_access() {
        println!(
            "  {} {}",
            "⚠".yellow(),
            "Full Disk Access not granted; some locations will be skipped.".yellow()
        );
    }

    let report = run_scan(&orchestrator, categories, human)?;

    match out {
        OutputFormat::Human => output::print_scan_report(&report, detailed),
        OutputFormat::Json => output::print_scan_json(&report)?,
        OutputFormat::Quiet => output::print_scan_quiet(&report),
    }
    Ok(())
}

// ─── Estimate ─────────────────────────────────────────────────────────────────

fn cmd_estimate(config: &Config, out: OutputFormat, categories: &[Category]) -> Result<()> {
    let orchestrator = build_orchestrator(config);
    let wanted: Vec<Category> = if categories.is_empty() {
        Category::ALL.to_vec()
    } else {
        categories.to_vec()
    };

    let estimates: Vec<(Category, u64)> = wanted
        .into_iter()
        .map(|c| (c, orchestrator.estimate_category_size(c)))
        .collect();

    match out {
        OutputFormat::Human => output::print_estimates(&estimates),
        OutputFormat::Json => {
            let json: serde_json::Map<String, serde_json::Value> = estimates
                .iter()
                .map(|(c, size)| (c.id().to_string(), serde_json::json!(size)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Quiet => {
            for (c, size) in &estimates {
                println!("{}\t{}", c.id(), size);
            }
        }
    }
    Ok(())
}

// ─── Clean ────────────────────────────────────────────────────────────────────

fn cmd_clean(
    config: &Config,
    out: OutputFormat,
    categories: &[Category],
    permanent: bool,
    yes: bool,
    dry_run: bool,
) -> Result<()> {
    let orchestrator = build_orchestrator(config);
    let human = out == OutputFormat::Human;
    let move_to_trash = config.move_to_trash && !permanent;

    if !yes && !dry_run && !human {
        anyhow::bail!("Non-interactive output needs --yes to clean");
    }

    let report = run_scan(&orchestrator, categories, human)?;
    let candidates: Vec<CandidateItem> = report.all_items().into_iter().cloned().collect();

    if candidates.is_empty() {
        match out {
            OutputFormat::Human => println!("  {} Nothing to clean!", "✨"),
            OutputFormat::Json => output::print_clean_json(&CleanOutcome::default(), move_to_trash)?,
            OutputFormat::Quiet => println!("0\t0\t0"),
        }
        return Ok(());
    }

    let warnings: Vec<(&CandidateItem, ValidationOutcome)> = candidates
        .iter()
        .map(|item| (item, orchestrator.policy().validate(item.path())))
        .filter(|(_, outcome)| outcome.is_warning())
        .collect();

    if human {
        output::print_scan_report(&report, false);
        output::print_warnings(&warnings);
    }

    if dry_run {
        match out {
            OutputFormat::Json => output::print_scan_json(&report)?,
            OutputFormat::Quiet => output::print_scan_quiet(&report),
            OutputFormat::Human => println!(
                "  {} Dry run: would clean {} ({}). No files modified.",
                "ℹ️",
                format::format_count(candidates.len()),
                format::format_size(report.total_size())
            ),
        }
        return Ok(());
    }

    if !yes {
        let action = if move_to_trash { "Move to Trash" } else { "PERMANENTLY DELETE" };
        let prompt = format!(
            "{} {} ({})?",
            action,
            format::format_count(candidates.len()),
            format::format_size(report.total_size())
        );
        if !confirm(&prompt)? {
            println!("  {} Cancelled", "✗".red());
            return Ok(());
        }
    }

    let outcome = run_clean(&orchestrator, &candidates, move_to_trash, human)?;

    match out {
        OutputFormat::Human => output::print_clean_outcome(&outcome, move_to_trash),
        OutputFormat::Json => output::print_clean_json(&outcome, move_to_trash)?,
        OutputFormat::Quiet => println!(
            "{}\t{}\t{}",
            outcome.succeeded_count(),
            outcome.failed_count(),
            outcome.freed_bytes()
        ),
    }
    Ok(())
}

// ─── Validate ─────────────────────────────────────────────────────────────────

fn cmd_validate(config: &Config, out: OutputFormat, paths: &[String]) -> Result<()> {
    let orchestrator = build_orchestrator(config);
    let expanded: Vec<PathBuf> = paths.iter().map(|p| expand_tilde(p)).collect();
    let verdicts = orchestrator.policy().validate_batch(&expanded);

    let results: Vec<(PathBuf, ValidationOutcome)> = expanded
        .into_iter()
        .filter_map(|p| verdicts.get(&p).cloned().map(|v| (p, v)))
        .collect();

    match out {
        OutputFormat::Human => output::print_validation(&results),
        OutputFormat::Json => output::print_validation_json(&results)?,
        OutputFormat::Quiet => {
            for (path, outcome) in &results {
                let label = match outcome {
                    ValidationOutcome::Safe => "safe",
                    ValidationOutcome::Warning(_) => "warning",
                    ValidationOutcome::Unsafe(_) => "unsafe",
                };
                println!("{}\t{}", label, path.display());
            }
        }
    }
    Ok(())
}

// ─── Protect ──────────────────────────────────────────────────────────────────

fn cmd_protect(mut config: Config, out: OutputFormat, action: &ProtectAction) -> Result<()> {
    match action {
        ProtectAction::Add { path } => {
            if config.add_protected(path) {
                config.save()?;
                println!("  {} Protected {}", "✓".green(), path);
            } else {
                println!("  {} {} is already protected", "ℹ️", path);
            }
        }
        ProtectAction::Remove { path } => {
            if config.remove_protected(path) {
                config.save()?;
                println!("  {} No longer protecting {}", "✓".green(), path);
            } else {
                println!("  {} {} was not protected", "ℹ️", path);
            }
        }
        ProtectAction::List => match out {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config.protected_paths)?),
            OutputFormat::Quiet => {
                for path in &config.protected_paths {
                    println!("{}", path);
                }
            }
            OutputFormat::Human => {
                format::print_header("Protected paths");
                if config.protected_paths.is_empty() {
                    println!("  {}", "No protected paths configured.".dimmed());
                }
                for (raw, expanded) in config.protected_paths.iter().zip(config.expanded_protected_paths()) {
                    let marker = if expanded.exists() { "●".green() } else { "○".dimmed() };
                    println!("  {} {}", marker, raw);
                }
                println!();
            }
        },
    }
    Ok(())
}

// ─── Config ───────────────────────────────────────────────────────────────────

fn cmd_config(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("  {} Configuration reset to defaults", "✓".green());
        }
        ConfigAction::Path => println!("{}", Config::config_path().display()),
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(key, value)?;
            config.save()?;
            println!("  {} Set {} = {}", "✓".green(), key, value);
        }
    }
    Ok(())
}
