use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Global Mole configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Move cleaned items to the trash instead of removing them
    #[serde(default = "default_move_to_trash")]
    pub move_to_trash: bool,

    /// Paths that must never be deleted (`~` is expanded)
    #[serde(default)]
    pub protected_paths: Vec<String>,

    /// Override the trash location
    #[serde(default)]
    pub trash_dir: Option<PathBuf>,

    /// Report scan progress every N entries
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Give directory candidates their recursive size instead of 0
    #[serde(default = "default_measure_directories")]
    pub measure_directories: bool,

    /// Additional roots per category id (`~` and globs are expanded)
    #[serde(default)]
    pub extra_roots: BTreeMap<String, Vec<String>>,

    /// Output format preference
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Also write logs to ~/.mole/logs
    #[serde(default)]
    pub log_to_file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Quiet,
}

fn default_move_to_trash() -> bool {
    true
}
fn default_progress_interval() -> usize {
    100
}
fn default_measure_directories() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            move_to_trash: default_move_to_trash(),
            protected_paths: Vec::new(),
            trash_dir: None,
            progress_interval: default_progress_interval(),
            measure_directories: default_measure_directories(),
            extra_roots: BTreeMap::new(),
            output_format: OutputFormat::Human,
            log_to_file: false,
        }
    }
}

impl Config {
    /// Get the Mole data directory (~/.mole)
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".mole")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Get the logs directory
    pub fn logs_dir() -> PathBuf {
        Self::data_dir().join("logs")
    }

    /// Load config from file, or use defaults if it does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Set a single value by key, as used by `mole config set`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "move_to_trash" => self.move_to_trash = parse_bool(key, value)?,
            "measure_directories" => self.measure_directories = parse_bool(key, value)?,
            "log_to_file" => self.log_to_file = parse_bool(key, value)?,
            "progress_interval" => {
                let n: usize = value
                    .parse()
                    .with_context(|| format!("'{}' expects a positive integer", key))?;
                if n == 0 {
                    anyhow::bail!("'{}' must be greater than zero", key);
                }
                self.progress_interval = n;
            }
            "trash_dir" => {
                self.trash_dir = if value.is_empty() {
                    None
                } else {
                    Some(expand_tilde(value))
                };
            }
            "output_format" => {
                self.output_format = match value {
                    "human" => OutputFormat::Human,
                    "json" => OutputFormat::Json,
                    "quiet" => OutputFormat::Quiet,
                    other => anyhow::bail!("Unknown output format '{}'", other),
                };
            }
            other => anyhow::bail!("Unknown config key '{}'", other),
        }
        Ok(())
    }

    /// Add a protected path; returns false if it was already present
    pub fn add_protected(&mut self, path: &str) -> bool {
        if self.protected_paths.iter().any(|p| p == path) {
            return false;
        }
        self.protected_paths.push(path.to_string());
        true
    }

    /// Remove a protected path; returns false if it was not present
    pub fn remove_protected(&mut self, path: &str) -> bool {
        let before = self.protected_paths.len();
        self.protected_paths.retain(|p| p != path);
        self.protected_paths.len() != before
    }

    /// Protected paths with `~` expanded
    pub fn expanded_protected_paths(&self) -> Vec<PathBuf> {
        self.protected_paths.iter().map(|p| expand_tilde(p)).collect()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => anyhow::bail!("'{}' expects true or false, got '{}'", key, value),
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_default();
    }
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().unwrap_or_default().join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.move_to_trash);
        assert_eq!(config.progress_interval, 100);
        assert!(config.measure_directories);
        assert!(config.protected_paths.is_empty());
        assert!(config.trash_dir.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("move_to_trash = false\n").unwrap();
        assert!(!config.move_to_trash);
        assert_eq!(config.progress_interval, 100);
    }

    #[test]
    fn test_set_values() {
        let mut config = Config::default();
        config.set("move_to_trash", "false").unwrap();
        config.set("progress_interval", "250").unwrap();
        config.set("output_format", "json").unwrap();
        assert!(!config.move_to_trash);
        assert_eq!(config.progress_interval, 250);
        assert_eq!(config.output_format, OutputFormat::Json);

        assert!(config.set("progress_interval", "0").is_err());
        assert!(config.set("nope", "1").is_err());
        assert!(config.set("log_to_file", "maybe").is_err());
    }

    #[test]
    fn test_protected_paths_dedup() {
        let mut config = Config::default();
        assert!(config.add_protected("/tmp/keep"));
        assert!(!config.add_protected("/tmp/keep"));
        assert!(config.remove_protected("/tmp/keep"));
        assert!(!config.remove_protected("/tmp/keep"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.add_protected("/tmp/keep");
        config
            .extra_roots
            .insert("user_caches".into(), vec!["/tmp/cache".into()]);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.protected_paths, vec!["/tmp/keep".to_string()]);
        assert_eq!(loaded.extra_roots["user_caches"], vec!["/tmp/cache".to_string()]);
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs"), PathBuf::from("/abs"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x"), home.join("x"));
        }
    }
}
