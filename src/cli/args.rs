use clap::{Parser, Subcommand, ValueEnum};

use crate::scanner::targets::Category;

/// Mole: a safety-gated cache and junk cleanup utility
#[derive(Parser, Debug)]
#[command(
    name = "mole",
    version,
    about = "A safety-gated cache and junk cleanup utility",
    long_about = "Mole scans user caches, logs, the Trash, browser and developer tool caches\n\
                   for cleanup candidates, filters them through a path safety policy,\n\
                   and moves what you select to the Trash.",
    after_help = "EXAMPLES:\n  \
        mole categories                              List cleanup categories\n  \
        mole scan                                    Scan every category\n  \
        mole scan --category dev_tool_caches         Scan developer caches only\n  \
        mole estimate                                Quick on-disk size per category\n  \
        mole clean --category user_caches --dry-run  Preview a cleanup\n  \
        mole clean --permanent --yes                 Delete without the Trash\n  \
        mole validate ~/Library/Caches/foo           Explain the safety verdict\n  \
        mole protect add ~/Library/Caches/keep-me    Never delete this path"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output (debug logs on stderr)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode, minimal output
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List cleanup categories and their locations
    Categories {
        /// Show every root path
        #[arg(long)]
        detailed: bool,
    },

    /// Scan for cleanup candidates
    Scan {
        /// Only scan these categories (comma separated ids)
        #[arg(long = "category", value_delimiter = ',')]
        categories: Vec<Category>,

        /// Show individual candidates
        #[arg(long)]
        detailed: bool,
    },

    /// Estimate the on-disk size of each category
    Estimate {
        /// Only estimate these categories (comma separated ids)
        #[arg(long = "category", value_delimiter = ',')]
        categories: Vec<Category>,
    },

    /// Scan, then remove every candidate found
    Clean {
        /// Only clean these categories (comma separated ids)
        #[arg(long = "category", value_delimiter = ',')]
        categories: Vec<Category>,

        /// Delete permanently instead of moving to the Trash
        #[arg(long)]
        permanent: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,

        /// Show what would be cleaned without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Check paths against the safety policy
    Validate {
        /// Paths to check
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Manage paths that must never be deleted
    Protect {
        #[command(subcommand)]
        action: ProtectAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProtectAction {
    /// Protect a path
    Add { path: String },

    /// Remove a protection
    Remove { path: String },

    /// List protected paths
    List,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset to default configuration
    Reset,

    /// Print the config file location
    Path,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
    Quiet,
}

impl From<&crate::common::config::OutputFormat> for OutputFormat {
    fn from(f: &crate::common::config::OutputFormat) -> Self {
        match f {
            crate::common::config::OutputFormat::Human => OutputFormat::Human,
            crate::common::config::OutputFormat::Json => OutputFormat::Json,
            crate::common::config::OutputFormat::Quiet => OutputFormat::Quiet,
        }
    }
}

#[derive(ValueEnum, Clone, Debug)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
