use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Usage counters persisted between runs. Counters only ever grow; a corrupt
/// or missing file restarts from an empty state.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub total_interactions: u64,
    #[serde(default)]
    pub tools_triggered: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub interactions_with_context: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context_fields_found: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub messages_logged: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// What one run contributed, beyond the per-tool trigger count.
pub enum RunOutcome {
    /// Context-summary mode: the field names present in the context mapping.
    ContextSummary { context_fields: Vec<String> },
    /// Message mode: how many new messages were logged.
    MessagesLogged(u64),
}

/// Apply one run's outcome to the persisted counters, under an exclusive
/// lock on the stats file. Callers treat failures as best-effort.
pub fn record(stats_path: &Path, tool_name: &str, outcome: &RunOutcome) -> Result<()> {
    if let Some(parent) = stats_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(stats_path)
        .with_context(|| format!("Failed to open {}", stats_path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("Failed to lock {}", stats_path.display()))?;

    let result = record_locked(&mut file, tool_name, outcome);
    let _ = file.unlock();
    result
}

fn record_locked(file: &mut File, tool_name: &str, outcome: &RunOutcome) -> Result<()> {
    let mut raw = String::new();
    file.read_to_string(&mut raw)
        .context("Failed to read statistics")?;
    let mut stats: Stats = serde_json::from_str(&raw).unwrap_or_default();

    apply(&mut stats, tool_name, outcome);

    file.seek(SeekFrom::Start(0))
        .context("Failed to rewind statistics")?;
    file.set_len(0).context("Failed to truncate statistics")?;
    let serialized = serde_json::to_string_pretty(&stats)?;
    file.write_all(serialized.as_bytes())
        .context("Failed to write statistics")?;
    Ok(())
}

fn apply(stats: &mut Stats, tool_name: &str, outcome: &RunOutcome) {
    stats.total_interactions += 1;
    *stats
        .tools_triggered
        .entry(tool_name.to_string())
        .or_insert(0) += 1;

    match outcome {
        RunOutcome::ContextSummary { context_fields } => {
            if !context_fields.is_empty() {
                stats.interactions_with_context += 1;
                for field in context_fields {
                    *stats.context_fields_found.entry(field.clone()).or_insert(0) += 1;
                }
            }
        }
        RunOutcome::MessagesLogged(count) => {
            stats.messages_logged += count;
        }
    }
}
