use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Prefixes that mark tool-injected or system text, never real user input.
const SKIP_PREFIXES: [&str; 3] = ["<command-", "Stop hook feedback", "[Request interrupted"];

/// Bounds on how much transcript is scanned per invocation. The window keeps
/// each run O(1) relative to transcript size, since this fires on every tool
/// call.
#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    /// Trailing transcript lines to scan.
    pub max_lines: usize,
    /// Maximum messages returned per invocation.
    pub max_messages: usize,
    /// Messages shorter than this are dropped.
    pub min_length: usize,
    /// Also drop "Caveat:" system reminders (context-summary mode).
    pub skip_caveats: bool,
}

/// Represents a transcript line with its type discriminator and message
#[derive(Debug, Deserialize)]
struct TranscriptLine {
    #[serde(rename = "type")]
    type_: Option<String>,
    message: Option<TranscriptMessage>,
}

/// Message content is either a plain string or an array of content blocks
#[derive(Debug, Deserialize)]
struct TranscriptMessage {
    content: Option<Value>,
}

/// Extract recent user messages from a JSONL transcript, most-recent-last.
///
/// A missing or unreadable transcript yields an empty list; malformed lines
/// are skipped individually. The session id is accepted for interface parity
/// but entries are matched by type and position only.
pub fn extract_user_messages(
    transcript_path: &str,
    _session_id: &str,
    limits: &ExtractLimits,
) -> Vec<String> {
    let path = Path::new(transcript_path);
    if !path.exists() {
        return Vec::new();
    }
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Vec::new(),
    };

    let lines: Vec<String> = BufReader::new(file).lines().map_while(Result::ok).collect();
    let window = lines.len().saturating_sub(limits.max_lines);

    let mut messages = Vec::new();
    for line in &lines[window..] {
        let Ok(entry) = serde_json::from_str::<TranscriptLine>(line.trim()) else {
            continue;
        };
        if entry.type_.as_deref() != Some("user") {
            continue;
        }
        let Some(content) = entry.message.and_then(|m| m.content) else {
            continue;
        };
        let Some(text) = content_text(&content) else {
            continue;
        };
        let text = text.trim();
        if qualifies(text, limits) {
            messages.push(text.to_string());
        }
    }

    let keep = messages.len().saturating_sub(limits.max_messages);
    messages.split_off(keep)
}

/// Text of a message content value: the string itself, or the text field of
/// the first block when content is an array (stringified if the first block
/// is not an object).
fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(blocks) => match blocks.first()? {
            Value::Object(block) => Some(
                block
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        },
        _ => None,
    }
}

fn qualifies(text: &str, limits: &ExtractLimits) -> bool {
    if text.chars().count() < limits.min_length {
        return false;
    }
    if SKIP_PREFIXES.iter().any(|prefix| text.starts_with(prefix)) {
        return false;
    }
    if limits.skip_caveats && text.starts_with("Caveat:") {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LIMITS: ExtractLimits = ExtractLimits {
        max_lines: 20,
        max_messages: 3,
        min_length: 10,
        skip_caveats: false,
    };

    fn transcript(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    fn extract(lines: &[&str], limits: &ExtractLimits) -> Vec<String> {
        let file = transcript(lines);
        extract_user_messages(file.path().to_str().unwrap(), "session", limits)
    }

    #[test]
    fn test_nonexistent_transcript() {
        let messages = extract_user_messages("/nonexistent/path.jsonl", "session", &LIMITS);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_string_content() {
        let messages = extract(
            &[r#"{"type":"user","message":{"content":"Please refactor the parser module"}}"#],
            &LIMITS,
        );
        assert_eq!(messages, vec!["Please refactor the parser module"]);
    }

    #[test]
    fn test_block_array_content() {
        let messages = extract(
            &[r#"{"type":"user","message":{"content":[{"type":"text","text":"Add a retry flag to the CLI"}]}}"#],
            &LIMITS,
        );
        assert_eq!(messages, vec!["Add a retry flag to the CLI"]);
    }

    #[test]
    fn test_non_user_entries_skipped() {
        let messages = extract(
            &[r#"{"type":"assistant","message":{"content":"I will refactor the parser"}}"#],
            &LIMITS,
        );
        assert!(messages.is_empty());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let messages = extract(
            &[
                "not json at all",
                r#"{"type":"user","message":{"content":"Please refactor the parser module"}}"#,
            ],
            &LIMITS,
        );
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_short_messages_dropped() {
        let messages = extract(
            &[r#"{"type":"user","message":{"content":"short"}}"#],
            &LIMITS,
        );
        assert!(messages.is_empty());
    }

    #[test]
    fn test_system_prefixes_dropped() {
        let messages = extract(
            &[
                r#"{"type":"user","message":{"content":"<command-name>/clear</command-name>"}}"#,
                r#"{"type":"user","message":{"content":"Stop hook feedback: check failed"}}"#,
                r#"{"type":"user","message":{"content":"[Request interrupted by user]"}}"#,
            ],
            &LIMITS,
        );
        assert!(messages.is_empty());
    }

    #[test]
    fn test_caveat_dropped_only_when_enabled() {
        let lines = [r#"{"type":"user","message":{"content":"Caveat: the messages below were generated"}}"#];
        assert_eq!(extract(&lines, &LIMITS).len(), 1);

        let skipping = ExtractLimits {
            skip_caveats: true,
            ..LIMITS
        };
        assert!(extract(&lines, &skipping).is_empty());
    }

    #[test]
    fn test_message_cap() {
        let line = r#"{"type":"user","message":{"content":"message number NUM of the batch"}}"#;
        let lines: Vec<String> = (0..5).map(|n| line.replace("NUM", &n.to_string())).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let messages = extract(&refs, &LIMITS);
        assert_eq!(messages.len(), 3);
        // Most-recent-last, earliest entries dropped first.
        assert!(messages[0].contains("number 2"));
        assert!(messages[2].contains("number 4"));
    }

    #[test]
    fn test_line_window() {
        let mut lines: Vec<String> = vec![
            r#"{"type":"user","message":{"content":"this one is outside the window"}}"#.to_string(),
        ];
        for _ in 0..20 {
            lines.push(r#"{"type":"assistant","message":{"content":"filler"}}"#.to_string());
        }
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        assert!(extract(&refs, &LIMITS).is_empty());
    }
}
