use serde::Deserialize;
use serde_json::{Map, Value};

/// Input JSON from Claude Code hook system
#[derive(Debug, Deserialize)]
pub struct HookInput {
    #[serde(default = "unknown")]
    pub tool_name: String,
    #[serde(default = "unknown")]
    pub session_id: String,
    pub transcript_path: Option<String>,
    /// Remaining event fields, scanned for the context allow-list.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unknown() -> String {
    "unknown".to_string()
}

/// Event fields copied verbatim into the context mapping when present.
const CONTEXT_FIELDS: [&str; 12] = [
    "user_message",
    "message",
    "prompt",
    "input",
    "context",
    "user_input",
    "query",
    "request",
    "content",
    "text",
    "user_context",
    "conversation_context",
];

/// Assemble the per-run context mapping: recent messages pulled from the
/// transcript, plus any allow-listed fields found directly on the event.
/// An empty mapping is a valid result the caller must tolerate.
pub fn assemble_context(input: &HookInput, recent_messages: &[String]) -> Vec<(String, Value)> {
    let mut context = Vec::new();

    if !recent_messages.is_empty() {
        let messages = recent_messages.iter().cloned().map(Value::String).collect();
        context.push(("recent_user_messages".to_string(), Value::Array(messages)));
    }

    for field in CONTEXT_FIELDS {
        if let Some(value) = input.extra.get(field) {
            context.push((field.to_string(), value.clone()));
        }
    }

    context
}
