use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILENAME: &str = "input-logger.yaml";

/// Tunables for the logging hook, loaded from `<base>/hooks/input-logger.yaml`.
/// Every field has a default so a missing or partial file is fine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log one context-summary line per run instead of one line per new
    /// deduplicated message.
    pub context_summary_mode: bool,
    /// Trailing transcript lines to scan for user messages.
    pub max_transcript_lines: usize,
    /// Maximum messages to capture per hook trigger.
    pub max_messages_per_capture: usize,
    /// Minimum message length to capture.
    pub min_message_length: usize,
    /// Days to retain log files (not implemented yet).
    #[allow(dead_code)]
    pub log_retention_days: u32,
    /// Create separate daily log files.
    pub enable_daily_logs: bool,
    /// Track usage statistics.
    pub enable_statistics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context_summary_mode: false,
            max_transcript_lines: 20,
            max_messages_per_capture: 3,
            min_message_length: 10,
            log_retention_days: 30,
            enable_daily_logs: true,
            enable_statistics: true,
        }
    }
}

/// Base directory for all persisted files: $CLAUDE_CONFIG_DIR if set,
/// otherwise ~/.claude.
pub fn base_dir() -> PathBuf {
    std::env::var("CLAUDE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".claude")
        })
}

pub fn main_log_path(base: &Path) -> PathBuf {
    base.join("user-inputs-log.txt")
}

pub fn daily_log_path(base: &Path, date: &str) -> PathBuf {
    base.join("hooks").join(format!("user-inputs-{}.log", date))
}

pub fn recent_messages_path(base: &Path) -> PathBuf {
    base.join("hooks").join("recent-messages.json")
}

pub fn stats_path(base: &Path) -> PathBuf {
    base.join("hooks").join("user-input-stats.json")
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Load the hook configuration. A missing file yields defaults; an unreadable
/// or invalid file is reported and also yields defaults, since configuration
/// must never fail the run.
pub fn load(base: &Path) -> Config {
    let path = base.join("hooks").join(CONFIG_FILENAME);
    if !path.exists() {
        return Config::default();
    }
    match load_config_file(&path) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("ignoring config {}: {:#}", path.display(), err);
            Config::default()
        }
    }
}
