use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Task type of correction jobs, which get extra prefix stripping.
pub const VOICE_CORRECTION_TASK: &str = "voice_correction";

/// Lifecycle status reported by the background job system.
///
/// The set is open: statuses this client does not know are kept verbatim
/// in [`JobStatus::Other`] and treated as still processing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Idle,
    Created,
    Queued,
    AcknowledgedByWorker,
    Preparing,
    PreparingInput,
    GeneratingStream,
    ProcessingStream,
    Running,
    CompletedByTag,
    Completed,
    Failed,
    Canceled,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Created => "created",
            JobStatus::Queued => "queued",
            JobStatus::AcknowledgedByWorker => "acknowledgedByWorker",
            JobStatus::Preparing => "preparing",
            JobStatus::PreparingInput => "preparingInput",
            JobStatus::GeneratingStream => "generatingStream",
            JobStatus::ProcessingStream => "processingStream",
            JobStatus::Running => "running",
            JobStatus::CompletedByTag => "completedByTag",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
            JobStatus::Other(s) => s,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::CompletedByTag)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Canceled)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_completed() || self.is_failed()
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        match s {
            "idle" => JobStatus::Idle,
            "created" => JobStatus::Created,
            "queued" => JobStatus::Queued,
            "acknowledgedByWorker" | "acknowledged_by_worker" => JobStatus::AcknowledgedByWorker,
            "preparing" => JobStatus::Preparing,
            "preparingInput" | "preparing_input" => JobStatus::PreparingInput,
            "generatingStream" | "generating_stream" => JobStatus::GeneratingStream,
            "processingStream" | "processing_stream" => JobStatus::ProcessingStream,
            "running" => JobStatus::Running,
            "completedByTag" | "completed_by_tag" => JobStatus::CompletedByTag,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "canceled" => JobStatus::Canceled,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(JobStatus::from(s.as_str()))
    }
}

/// Free-form job metadata; only the streaming flag matters here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMetadata {
    #[serde(default)]
    pub is_streaming: bool,
}

/// Snapshot of a background transcription or correction job.
///
/// The record is owned by the remote job system; this crate only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    pub start_time: Option<i64>,
    /// Sent either as an object or as a JSON-encoded string.
    #[serde(default, deserialize_with = "metadata_lenient")]
    pub metadata: Option<JobMetadata>,
}

// Unreadable metadata only loses the streaming flag; the record still loads.
fn metadata_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<JobMetadata>, D::Error> {
    let metadata = match Value::deserialize(deserializer)? {
        Value::String(raw) => serde_json::from_str(&raw).ok(),
        value @ Value::Object(_) => serde_json::from_value(value).ok(),
        _ => None,
    };
    Ok(metadata)
}

impl BackgroundJob {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            response: None,
            task_type: None,
            error_message: None,
            status_message: None,
            start_time: None,
            metadata: None,
        }
    }

    pub fn is_voice_correction(&self) -> bool {
        self.task_type.as_deref() == Some(VOICE_CORRECTION_TASK)
    }

    pub fn is_streaming(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.is_streaming)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start_time
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}
