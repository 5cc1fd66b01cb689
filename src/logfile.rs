use anyhow::{Context, Result};
use chrono::Local;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{self, Config};

/// Context values longer than this are clipped with an ellipsis marker.
const MAX_VALUE_LEN: usize = 200;

/// Appends log lines to the global log and, when enabled, the per-day log.
pub struct LogWriter {
    destinations: Vec<PathBuf>,
}

impl LogWriter {
    pub fn new(base: &Path, config: &Config) -> Self {
        let mut destinations = vec![config::main_log_path(base)];
        if config.enable_daily_logs {
            let date = Local::now().format("%Y-%m-%d").to_string();
            destinations.push(config::daily_log_path(base, &date));
        }
        Self { destinations }
    }

    /// Append one line to every destination. Each append is independent and
    /// best-effort: a failed destination is reported and the rest are still
    /// attempted.
    pub fn append(&self, line: &str) {
        for path in &self.destinations {
            if let Err(err) = append_line(path, line) {
                tracing::warn!("could not write to log file {}: {:#}", path.display(), err);
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    writeln!(file, "{}", line).with_context(|| format!("Failed to append to {}", path.display()))
}

/// Local time at second precision, shared by every line of one run.
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn session_prefix(session_id: &str) -> String {
    session_id.chars().take(8).collect()
}

/// One line per new, deduplicated message.
pub fn message_line(timestamp: &str, session_id: &str, message: &str) -> String {
    format!("[{}] [{}] {}", timestamp, session_prefix(session_id), message)
}

/// One line per run summarizing the whole context mapping.
pub fn context_summary_line(
    timestamp: &str,
    session_id: &str,
    tool_name: &str,
    context: &[(String, Value)],
) -> String {
    let prefix = format!(
        "[{}] [{}] Tool: {}",
        timestamp,
        session_prefix(session_id),
        tool_name
    );
    if context.is_empty() {
        return format!("{} | No user context detected", prefix);
    }
    let fields: Vec<String> = context
        .iter()
        .map(|(key, value)| format!("{}: {}", key, clip(&value_text(value))))
        .collect();
    format!("{} | User Context: {}", prefix, fields.join(" | "))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn clip(text: &str) -> String {
    if text.chars().count() > MAX_VALUE_LEN {
        let clipped: String = text.chars().take(MAX_VALUE_LEN).collect();
        format!("{}...", clipped)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_message_line_truncates_session_id() {
        let line = message_line(
            "2026-08-27 10:00:00",
            "abc12345-6789-dead-beef",
            "Please refactor the parser module",
        );
        assert_eq!(
            line,
            "[2026-08-27 10:00:00] [abc12345] Please refactor the parser module"
        );
    }

    #[test]
    fn test_summary_line_empty_context() {
        let line = context_summary_line("2026-08-27 10:00:00", "abc12345", "Bash", &[]);
        assert_eq!(
            line,
            "[2026-08-27 10:00:00] [abc12345] Tool: Bash | No user context detected"
        );
    }

    #[test]
    fn test_summary_line_joins_fields() {
        let context = vec![
            ("prompt".to_string(), json!("fix the bug")),
            ("attempt".to_string(), json!(2)),
        ];
        let line = context_summary_line("2026-08-27 10:00:00", "abc12345", "Edit", &context);
        assert_eq!(
            line,
            "[2026-08-27 10:00:00] [abc12345] Tool: Edit | User Context: prompt: fix the bug | attempt: 2"
        );
    }

    #[test]
    fn test_summary_line_clips_long_values() {
        let context = vec![("prompt".to_string(), json!("x".repeat(250)))];
        let line = context_summary_line("2026-08-27 10:00:00", "abc12345", "Edit", &context);
        assert!(line.ends_with("..."));
        assert!(line.contains(&"x".repeat(200)));
        assert!(!line.contains(&"x".repeat(201)));
    }

    #[test]
    fn test_append_creates_dirs_and_appends() {
        let temp = TempDir::new().unwrap();
        let config = Config::default();
        let writer = LogWriter::new(temp.path(), &config);

        writer.append("first line");
        writer.append("second line");

        let main_log = fs::read_to_string(config::main_log_path(temp.path())).unwrap();
        assert_eq!(main_log, "first line\nsecond line\n");

        let date = Local::now().format("%Y-%m-%d").to_string();
        let daily = fs::read_to_string(config::daily_log_path(temp.path(), &date)).unwrap();
        assert_eq!(daily, main_log);
    }

    #[test]
    fn test_daily_log_disabled() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            enable_daily_logs: false,
            ..Config::default()
        };
        let writer = LogWriter::new(temp.path(), &config);
        writer.append("only the main log");

        assert!(config::main_log_path(temp.path()).exists());
        assert!(!temp.path().join("hooks").exists());
    }
}
