//! Text extraction from completed job responses.
//!
//! Job responses have historically arrived in several shapes: plain text,
//! JSON objects wrapping the text under one of a handful of field names,
//! chat-completion style `content` arrays, and objects nesting the text one
//! level down under `result`. [`Payload::sniff`] recognises these shapes
//! and [`extract`] turns a completed job into clean display text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::model::BackgroundJob;

/// Field names searched for the text, in priority order.
pub const TEXT_FIELDS: [&str; 7] = [
    "text",
    "response",
    "content",
    "transcription",
    "result",
    "output",
    "data",
];

const JSON_KEY_MARKERS: [&str; 3] = [r#""text":"#, r#""response":"#, r#""content":"#];

static CORRECTED_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*corrected text:\s*").expect("prefix pattern compiles")
});

static HERES_CORRECTED_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*here['’]s the corrected text:\s*").expect("prefix pattern compiles")
});

/// A recognised response shape, carrying the text it yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Not JSON, unparseable, or JSON with no recognised text field.
    PlainText(String),
    /// Top-level object with a string under one of [`TEXT_FIELDS`].
    FieldWrapped { field: &'static str, value: String },
    /// Chat-completion `content: [{"type": "text", "text": ...}]` parts.
    ChatCompletionContent(Vec<String>),
    /// `result` object with a string under one of [`TEXT_FIELDS`].
    NestedResult { field: &'static str, value: String },
}

impl Payload {
    /// Classify a raw response string.
    ///
    /// When several shapes are present at once the most specific wins:
    /// nested `result` text, then chat-completion content, then a top-level
    /// field. Anything else is returned untouched as plain text.
    pub fn sniff(raw: &str) -> Payload {
        if !looks_json_ish(raw) {
            return Payload::PlainText(raw.to_string());
        }

        let parsed = match serde_json::from_str::<Value>(raw) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "response looked like JSON but did not parse");
                return Payload::PlainText(raw.to_string());
            }
        };

        let Some(obj) = parsed.as_object() else {
            return Payload::PlainText(raw.to_string());
        };

        if let Some((field, value)) = obj
            .get("result")
            .and_then(Value::as_object)
            .and_then(find_text_field)
        {
            return Payload::NestedResult { field, value };
        }

        let parts = chat_content_parts(obj);
        if !parts.is_empty() {
            return Payload::ChatCompletionContent(parts);
        }

        if let Some((field, value)) = find_text_field(obj) {
            return Payload::FieldWrapped { field, value };
        }

        Payload::PlainText(raw.to_string())
    }

    /// The text this payload yields, before cleanup.
    pub fn text(&self) -> &str {
        match self {
            Payload::PlainText(text) => text,
            Payload::FieldWrapped { value, .. } | Payload::NestedResult { value, .. } => value,
            Payload::ChatCompletionContent(parts) => parts.first().map(String::as_str).unwrap_or(""),
        }
    }

    fn shape_name(&self) -> &'static str {
        match self {
            Payload::PlainText(_) => "plain_text",
            Payload::FieldWrapped { .. } => "field_wrapped",
            Payload::ChatCompletionContent(_) => "chat_completion",
            Payload::NestedResult { .. } => "nested_result",
        }
    }
}

/// Extract display text from a completed job.
///
/// Returns `None` when the job carries no response. Correction jobs also
/// lose a leading "Corrected text:" style preamble.
pub fn extract(job: &BackgroundJob) -> Option<String> {
    let raw = job.response.as_deref().filter(|r| !r.is_empty())?;
    let payload = Payload::sniff(raw);
    debug!(job_id = %job.id, shape = payload.shape_name(), "extracted job payload");

    let text = clean_text(payload.text());
    if job.is_voice_correction() {
        Some(strip_correction_prefix(&text).to_string())
    } else {
        Some(text)
    }
}

/// Drop one layer of wrapping double quotes and unescape `\n` and `\"`.
pub fn clean_text(text: &str) -> String {
    let unquoted = if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    };
    unquoted.replace("\\n", "\n").replace("\\\"", "\"")
}

/// Remove at most one correction preamble; the first matching form wins.
pub fn strip_correction_prefix(text: &str) -> &str {
    for prefix in [&*CORRECTED_PREFIX, &*HERES_CORRECTED_PREFIX] {
        if let Some(m) = prefix.find(text) {
            return &text[m.end()..];
        }
    }
    text
}

fn looks_json_ish(raw: &str) -> bool {
    let trimmed = raw.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || JSON_KEY_MARKERS.iter().any(|m| raw.contains(m))
}

fn find_text_field(obj: &Map<String, Value>) -> Option<(&'static str, String)> {
    TEXT_FIELDS.iter().find_map(|&field| {
        obj.get(field)
            .and_then(Value::as_str)
            .map(|s| (field, s.to_string()))
    })
}

fn chat_content_parts(obj: &Map<String, Value>) -> Vec<String> {
    obj.get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
