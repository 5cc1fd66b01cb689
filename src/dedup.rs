use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Most-recently-seen messages kept for duplicate suppression across runs.
const MAX_RECENT: usize = 20;

/// Return the candidates not present in the persisted recent-messages set,
/// in candidate order, and append them to the set (capped to the newest
/// `MAX_RECENT` entries).
///
/// The read-modify-write cycle holds an exclusive lock on the state file so
/// overlapping hook invocations cannot lose each other's updates. A missing
/// or corrupt state file starts from an empty set rather than failing.
pub fn filter_new_messages(state_path: &Path, candidates: &[String]) -> Result<Vec<String>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    if let Some(parent) = state_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(state_path)
        .with_context(|| format!("Failed to open {}", state_path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("Failed to lock {}", state_path.display()))?;

    let result = update_locked(&mut file, candidates);
    let _ = file.unlock();
    result
}

fn update_locked(file: &mut File, candidates: &[String]) -> Result<Vec<String>> {
    let mut raw = String::new();
    file.read_to_string(&mut raw)
        .context("Failed to read recent-messages state")?;
    let mut recent: Vec<String> = serde_json::from_str(&raw).unwrap_or_default();

    let new_messages: Vec<String> = candidates
        .iter()
        .filter(|candidate| !recent.contains(candidate))
        .cloned()
        .collect();
    if new_messages.is_empty() {
        return Ok(new_messages);
    }

    recent.extend(new_messages.iter().cloned());
    if recent.len() > MAX_RECENT {
        recent.drain(..recent.len() - MAX_RECENT);
    }

    file.seek(SeekFrom::Start(0))
        .context("Failed to rewind recent-messages state")?;
    file.set_len(0)
        .context("Failed to truncate recent-messages state")?;
    let serialized = serde_json::to_string(&recent)?;
    file.write_all(serialized.as_bytes())
        .context("Failed to write recent-messages state")?;

    Ok(new_messages)
}
