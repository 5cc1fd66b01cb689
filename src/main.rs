use anyhow::Result;
use std::io::Read;
use tracing_subscriber::EnvFilter;

mod config;
mod dedup;
mod input;
mod logfile;
mod stats;
mod transcript;

use config::Config;
use input::HookInput;
use std::path::Path;

fn main() {
    init_tracing();

    let mut buffer = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut buffer) {
        tracing::warn!("could not read stdin: {}", err);
        return;
    }

    // The only fatal error: an unparseable payload means the hook is wired
    // up wrong, and the invoking agent should notice.
    let hook_input: HookInput = match serde_json::from_str(&buffer) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!("invalid JSON input: {}", err);
            std::process::exit(1);
        }
    };

    // Everything past input parsing is best-effort: a logging failure must
    // never block the host agent, so errors are reported and discarded.
    if let Err(err) = run(&hook_input) {
        tracing::warn!("user input logging error: {:#}", err);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(hook_input: &HookInput) -> Result<()> {
    let base = config::base_dir();
    let config = config::load(&base);

    let limits = transcript::ExtractLimits {
        max_lines: config.max_transcript_lines,
        max_messages: config.max_messages_per_capture,
        min_length: config.min_message_length,
        skip_caveats: config.context_summary_mode,
    };
    let recent_messages = hook_input
        .transcript_path
        .as_deref()
        .map(|path| transcript::extract_user_messages(path, &hook_input.session_id, &limits))
        .unwrap_or_default();

    if config.context_summary_mode {
        log_context_summary(hook_input, &config, &base, &recent_messages)
    } else {
        log_new_messages(hook_input, &config, &base, &recent_messages)
    }
}

/// Context-summary mode: one line per run describing everything the user
/// contributed, logged whenever there is a context or a known tool name.
fn log_context_summary(
    hook_input: &HookInput,
    config: &Config,
    base: &Path,
    recent_messages: &[String],
) -> Result<()> {
    let context = input::assemble_context(hook_input, recent_messages);
    if context.is_empty() && hook_input.tool_name == "unknown" {
        return Ok(());
    }

    let writer = logfile::LogWriter::new(base, config);
    let line = logfile::context_summary_line(
        &logfile::timestamp(),
        &hook_input.session_id,
        &hook_input.tool_name,
        &context,
    );
    writer.append(&line);

    if config.enable_statistics {
        let context_fields = context.iter().map(|(key, _)| key.clone()).collect();
        update_statistics(
            base,
            &hook_input.tool_name,
            &stats::RunOutcome::ContextSummary { context_fields },
        );
    }
    Ok(())
}

/// Message mode: one line per extracted message not seen in a recent run.
fn log_new_messages(
    hook_input: &HookInput,
    config: &Config,
    base: &Path,
    candidates: &[String],
) -> Result<()> {
    if candidates.is_empty() {
        return Ok(());
    }

    let new_messages = dedup::filter_new_messages(&config::recent_messages_path(base), candidates)?;
    if new_messages.is_empty() {
        return Ok(());
    }

    let writer = logfile::LogWriter::new(base, config);
    let timestamp = logfile::timestamp();
    for message in &new_messages {
        writer.append(&logfile::message_line(
            &timestamp,
            &hook_input.session_id,
            message,
        ));
    }

    if config.enable_statistics {
        update_statistics(
            base,
            &hook_input.tool_name,
            &stats::RunOutcome::MessagesLogged(new_messages.len() as u64),
        );
    }
    Ok(())
}

/// Statistics never block the primary logging path.
fn update_statistics(base: &Path, tool_name: &str, outcome: &stats::RunOutcome) {
    if let Err(err) = stats::record(&config::stats_path(base), tool_name, outcome) {
        tracing::debug!("statistics update failed: {:#}", err);
    }
}
