//! Heuristic checks deciding whether transcribed or corrected text is usable.
//!
//! Every transcription and correction result passes through [`validate`]
//! before it reaches the user. The rules are ordered and the first match
//! wins, so the reported [`RejectReason`] is always the earliest failing rule.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Texts shorter than this (after trimming) are rejected.
pub const MIN_TEXT_CHARS: usize = 3;

/// Error-looking payloads are only rejected when shorter than this.
const ERROR_MESSAGE_MAX_CHARS: usize = 100;

/// `undefined` is only treated as an artifact in texts shorter than this.
const ARTIFACT_MAX_CHARS: usize = 20;

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid pattern compiles")
});

/// Why a candidate text was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Empty,
    TooShort,
    ErrorMessage,
    LooksLikeId,
    UnparsedJson,
    ProgrammingArtifact,
    ErrorMarker,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            RejectReason::Empty => "Empty text",
            RejectReason::TooShort => "Text too short",
            RejectReason::ErrorMessage => "Text contains error message",
            RejectReason::LooksLikeId => "Text looks like an ID",
            RejectReason::UnparsedJson => "Text looks like unparsed JSON",
            RejectReason::ProgrammingArtifact => "Text contains programming artifact",
            RejectReason::ErrorMarker => "Text contains error marker",
        };
        f.write_str(msg)
    }
}

/// Verdict for a single candidate text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(RejectReason),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Validation::Valid => None,
            Validation::Invalid(reason) => Some(*reason),
        }
    }

    /// Converts the verdict into a `Result`, convenient with `?`.
    pub fn into_result(self) -> Result<(), RejectReason> {
        match self {
            Validation::Valid => Ok(()),
            Validation::Invalid(reason) => Err(reason),
        }
    }
}

/// Classify a transcription or correction candidate as usable or not.
///
/// Pure and deterministic. Rules are applied in order:
/// empty, too short, short error payload, bare UUID, parseable JSON,
/// short `undefined` artifact, explicit error marker.
pub fn validate(text: Option<&str>) -> Validation {
    let Some(text) = text else {
        return Validation::Invalid(RejectReason::Empty);
    };
    if text.is_empty() {
        return Validation::Invalid(RejectReason::Empty);
    }

    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_TEXT_CHARS {
        return Validation::Invalid(RejectReason::TooShort);
    }

    let total_chars = text.chars().count();

    if text.contains("Error:")
        && (text.contains("API") || text.contains("failed"))
        && total_chars < ERROR_MESSAGE_MAX_CHARS
    {
        return Validation::Invalid(RejectReason::ErrorMessage);
    }

    if UUID_PATTERN.is_match(trimmed) {
        return Validation::Invalid(RejectReason::LooksLikeId);
    }

    if looks_like_json(trimmed) {
        return Validation::Invalid(RejectReason::UnparsedJson);
    }

    if text.contains("undefined") && total_chars < ARTIFACT_MAX_CHARS {
        return Validation::Invalid(RejectReason::ProgrammingArtifact);
    }

    if text.contains("<ERROR>") || text.contains("[ERROR]") {
        return Validation::Invalid(RejectReason::ErrorMarker);
    }

    Validation::Valid
}

// Bracket wrapping alone is not enough: the text must actually parse.
fn looks_like_json(trimmed: &str) -> bool {
    let wrapped = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    wrapped && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason_of(text: &str) -> Option<RejectReason> {
        validate(Some(text)).reason()
    }

    #[test]
    fn missing_and_empty_text_rejected() {
        assert_eq!(validate(None), Validation::Invalid(RejectReason::Empty));
        assert_eq!(reason_of(""), Some(RejectReason::Empty));
    }

    #[test]
    fn short_text_rejected_after_trimming() {
        for text in ["a", "ab", "  ab  ", "   ", "\n\t x"] {
            assert_eq!(reason_of(text), Some(RejectReason::TooShort), "{text:?}");
        }
        assert!(validate(Some("abc")).is_valid());
    }

    #[test]
    fn short_error_payload_rejected() {
        assert_eq!(reason_of("Error: API failed"), Some(RejectReason::ErrorMessage));
        assert_eq!(
            reason_of("Error: request failed"),
            Some(RejectReason::ErrorMessage)
        );
    }

    #[test]
    fn long_text_mentioning_errors_accepted() {
        let padded = format!("Error: API failed {}", "and then we talked about it ".repeat(5));
        assert!(padded.chars().count() >= 100);
        assert!(validate(Some(&padded)).is_valid());
    }

    #[test]
    fn error_prefix_without_api_or_failed_accepted() {
        assert!(validate(Some("Error: nothing happened")).is_valid());
    }

    #[test]
    fn uuid_rejected_case_insensitive() {
        assert_eq!(
            reason_of("550e8400-e29b-41d4-a716-446655440000"),
            Some(RejectReason::LooksLikeId)
        );
        assert_eq!(
            reason_of("550E8400-E29B-41D4-A716-446655440000"),
            Some(RejectReason::LooksLikeId)
        );
        assert!(RejectReason::LooksLikeId.to_string().contains("ID"));
    }

    #[test]
    fn uuid_inside_sentence_accepted() {
        assert!(validate(Some("job 550e8400-e29b-41d4-a716-446655440000 finished")).is_valid());
    }

    #[test]
    fn parseable_json_rejected() {
        assert_eq!(reason_of(r#"{"a":1}"#), Some(RejectReason::UnparsedJson));
        assert_eq!(reason_of("[1, 2, 3]"), Some(RejectReason::UnparsedJson));
        assert_eq!(reason_of(r#"  {"text": "hi"}  "#), Some(RejectReason::UnparsedJson));
    }

    #[test]
    fn unparseable_brackets_accepted() {
        assert!(validate(Some("{not json")).is_valid());
        assert!(validate(Some("{not json either}")).is_valid());
        assert!(validate(Some("[citation needed]")).is_valid());
    }

    #[test]
    fn short_undefined_rejected_long_accepted() {
        assert_eq!(reason_of("value undefined"), Some(RejectReason::ProgrammingArtifact));
        assert!(validate(Some("the behaviour is undefined in that case")).is_valid());
    }

    #[test]
    fn error_markers_rejected() {
        assert_eq!(
            reason_of("something went wrong <ERROR> here"),
            Some(RejectReason::ErrorMarker)
        );
        assert_eq!(reason_of("[ERROR] transcription"), Some(RejectReason::ErrorMarker));
    }

    #[test]
    fn ordinary_dictation_accepted() {
        let v = validate(Some("Add a retry button to the settings page"));
        assert!(v.is_valid());
        assert_eq!(v.reason(), None);
        assert!(v.into_result().is_ok());
    }

    #[test]
    fn reason_display() {
        assert_eq!(RejectReason::Empty.to_string(), "Empty text");
        assert_eq!(RejectReason::UnparsedJson.to_string(), "Text looks like unparsed JSON");
    }
}
