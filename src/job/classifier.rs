use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::model::{BackgroundJob, JobStatus};
use super::payload;
use crate::validation::validate;

/// Running jobs older than this are flagged as stuck.
pub const DEFAULT_STUCK_AFTER: Duration = Duration::from_secs(5 * 60);

/// Streaming partials must be longer than this (trimmed) to be surfaced.
const MIN_STREAMING_PREVIEW_CHARS: usize = 20;

pub const STUCK_JOB_WARNING: &str = "Job is taking longer than expected";

/// Coarse phase of a job as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobPhase::Processing => write!(f, "processing"),
            JobPhase::Completed => write!(f, "completed"),
            JobPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Normalized view of one job snapshot.
///
/// `processed` is true only on the poll that observed the terminal
/// transition. A `Processing` result may still carry `text` (a streaming
/// partial) or `error` (a stuck warning); both are advisory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub processed: bool,
    pub text: Option<String>,
    pub error: Option<String>,
    pub status: JobPhase,
}

impl JobResult {
    pub fn processing() -> Self {
        Self {
            processed: false,
            text: None,
            error: None,
            status: JobPhase::Processing,
        }
    }

    fn completed(text: Option<String>) -> Self {
        Self {
            processed: true,
            text,
            error: None,
            status: JobPhase::Completed,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            processed: true,
            text: None,
            error: Some(error),
            status: JobPhase::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != JobPhase::Processing
    }
}

/// Caller-owned ledger of job ids whose terminal state was already handled.
///
/// Scope one ledger per polling session. It is not synchronized; share it
/// across tasks only behind the caller's own lock.
#[derive(Debug, Clone, Default)]
pub struct ProcessedJobs {
    ids: HashSet<String>,
}

impl ProcessedJobs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns `false` if the id was already recorded.
    pub fn mark(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// Maps job snapshots onto [`JobResult`]s.
#[derive(Debug, Clone)]
pub struct JobClassifier {
    pub stuck_after: Duration,
}

impl Default for JobClassifier {
    fn default() -> Self {
        Self {
            stuck_after: DEFAULT_STUCK_AFTER,
        }
    }
}

impl JobClassifier {
    pub fn new(stuck_after: Duration) -> Self {
        Self { stuck_after }
    }

    pub fn classify(&self, job: Option<&BackgroundJob>, processed: &mut ProcessedJobs) -> JobResult {
        self.classify_at(job, processed, Utc::now())
    }

    /// Classify a snapshot against an explicit clock.
    ///
    /// Terminal jobs are recorded in `processed` so a second observation of
    /// the same job is a no-op. Non-terminal jobs never touch the ledger.
    pub fn classify_at(
        &self,
        job: Option<&BackgroundJob>,
        processed: &mut ProcessedJobs,
        now: DateTime<Utc>,
    ) -> JobResult {
        let Some(job) = job else {
            return JobResult::processing();
        };
        if processed.contains(&job.id) {
            return JobResult::processing();
        }

        if job.status.is_completed() {
            processed.mark(&job.id);
            let text = payload::extract(job);
            if let Some(reason) = text.as_deref().and_then(|t| validate(Some(t)).reason()) {
                warn!(job_id = %job.id, %reason, "completed job produced unusable text");
                return JobResult::failed(format!("Invalid content: {reason}"));
            }
            info!(job_id = %job.id, has_text = text.is_some(), "job completed");
            return JobResult::completed(text);
        }

        if job.status.is_failed() {
            processed.mark(&job.id);
            let error = failure_message(job);
            info!(job_id = %job.id, %error, "job failed");
            return JobResult::failed(error);
        }

        if job.status == JobStatus::Running {
            if let Some(started) = job.started_at() {
                let elapsed = now.signed_duration_since(started);
                if elapsed.to_std().is_ok_and(|e| e > self.stuck_after) {
                    warn!(job_id = %job.id, elapsed_secs = elapsed.num_seconds(), "job looks stuck");
                    return JobResult {
                        error: Some(STUCK_JOB_WARNING.to_string()),
                        ..JobResult::processing()
                    };
                }
            }

            if job.is_streaming()
                && let Some(partial) = streaming_preview(job.response.as_deref())
            {
                debug!(job_id = %job.id, chars = partial.len(), "streaming partial available");
                return JobResult {
                    text: Some(partial.to_string()),
                    ..JobResult::processing()
                };
            }
        }

        JobResult::processing()
    }
}

fn failure_message(job: &BackgroundJob) -> String {
    job.error_message
        .as_deref()
        .filter(|m| !m.is_empty())
        .or(job.status_message.as_deref().filter(|m| !m.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| match job.status {
            JobStatus::Canceled => "Operation was canceled".to_string(),
            _ => "Operation failed".to_string(),
        })
}

fn streaming_preview(response: Option<&str>) -> Option<&str> {
    let response = response?;
    if response.trim().chars().count() <= MIN_STREAMING_PREVIEW_CHARS {
        return None;
    }
    validate(Some(response)).is_valid().then_some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::model::JobMetadata;
    use chrono::Duration as ChronoDuration;

    fn job(id: &str, status: JobStatus) -> BackgroundJob {
        BackgroundJob::new(id, status)
    }

    fn running_since(now: DateTime<Utc>, ago: ChronoDuration) -> BackgroundJob {
        let mut j = job("run-1", JobStatus::Running);
        j.start_time = Some((now - ago).timestamp_millis());
        j
    }

    #[test]
    fn missing_job_is_processing() {
        let mut ledger = ProcessedJobs::new();
        let r = JobClassifier::default().classify(None, &mut ledger);
        assert_eq!(r, JobResult::processing());
        assert!(ledger.is_empty());
    }

    #[test]
    fn completed_job_processed_once() {
        let classifier = JobClassifier::default();
        let mut ledger = ProcessedJobs::new();
        let mut j = job("done-1", JobStatus::Completed);
        j.response = Some(r#"{"text":"hello world"}"#.into());

        let first = classifier.classify(Some(&j), &mut ledger);
        assert!(first.processed);
        assert_eq!(first.status, JobPhase::Completed);
        assert_eq!(first.text.as_deref(), Some("hello world"));
        assert!(ledger.contains("done-1"));

        let second = classifier.classify(Some(&j), &mut ledger);
        assert!(!second.processed);
        assert_eq!(second.status, JobPhase::Processing);
        assert_eq!(second.text, None);
    }

    #[test]
    fn completed_without_response_has_no_text() {
        let mut ledger = ProcessedJobs::new();
        let r = JobClassifier::default().classify(Some(&job("c", JobStatus::CompletedByTag)), &mut ledger);
        assert_eq!(r.status, JobPhase::Completed);
        assert!(r.processed);
        assert_eq!(r.text, None);
    }

    #[test]
    fn completed_with_garbage_fails() {
        let mut ledger = ProcessedJobs::new();
        let mut j = job("bad", JobStatus::Completed);
        j.response = Some("550e8400-e29b-41d4-a716-446655440000".into());
        let r = JobClassifier::default().classify(Some(&j), &mut ledger);
        assert!(r.processed);
        assert_eq!(r.status, JobPhase::Failed);
        assert_eq!(r.text, None);
        assert_eq!(r.error.as_deref(), Some("Invalid content: Text looks like an ID"));
    }

    #[test]
    fn failure_message_priority() {
        let classifier = JobClassifier::default();
        let mut ledger = ProcessedJobs::new();

        let mut j = job("f1", JobStatus::Failed);
        j.error_message = Some("quota exceeded".into());
        j.status_message = Some("ignored".into());
        assert_eq!(
            classifier.classify(Some(&j), &mut ledger).error.as_deref(),
            Some("quota exceeded")
        );

        let mut j = job("f2", JobStatus::Failed);
        j.status_message = Some("worker crashed".into());
        assert_eq!(
            classifier.classify(Some(&j), &mut ledger).error.as_deref(),
            Some("worker crashed")
        );

        let r = classifier.classify(Some(&job("f3", JobStatus::Canceled)), &mut ledger);
        assert_eq!(r.error.as_deref(), Some("Operation was canceled"));
        assert_eq!(r.status, JobPhase::Failed);

        let r = classifier.classify(Some(&job("f4", JobStatus::Failed)), &mut ledger);
        assert_eq!(r.error.as_deref(), Some("Operation failed"));
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn stuck_running_job_warns_without_processing() {
        let now = Utc::now();
        let mut ledger = ProcessedJobs::new();
        let j = running_since(now, ChronoDuration::minutes(6));
        let r = JobClassifier::default().classify_at(Some(&j), &mut ledger, now);
        assert!(!r.processed);
        assert_eq!(r.status, JobPhase::Processing);
        assert_eq!(r.error.as_deref(), Some(STUCK_JOB_WARNING));
        assert!(ledger.is_empty());
    }

    #[test]
    fn fresh_running_job_is_plain_processing() {
        let now = Utc::now();
        let mut ledger = ProcessedJobs::new();
        let j = running_since(now, ChronoDuration::minutes(4));
        let r = JobClassifier::default().classify_at(Some(&j), &mut ledger, now);
        assert_eq!(r, JobResult::processing());
    }

    #[test]
    fn custom_stuck_threshold() {
        let now = Utc::now();
        let mut ledger = ProcessedJobs::new();
        let j = running_since(now, ChronoDuration::seconds(90));
        let r = JobClassifier::new(Duration::from_secs(60)).classify_at(Some(&j), &mut ledger, now);
        assert_eq!(r.error.as_deref(), Some(STUCK_JOB_WARNING));
    }

    #[test]
    fn streaming_partial_surfaced() {
        let mut ledger = ProcessedJobs::new();
        let mut j = job("s1", JobStatus::Running);
        j.metadata = Some(JobMetadata { is_streaming: true });
        j.response = Some("We should refactor the login".into());
        let r = JobClassifier::default().classify(Some(&j), &mut ledger);
        assert!(!r.processed);
        assert_eq!(r.status, JobPhase::Processing);
        assert_eq!(r.text.as_deref(), Some("We should refactor the login"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn streaming_partial_from_string_metadata() {
        let mut ledger = ProcessedJobs::new();
        let json = r#"{"id":"s4","status":"running","response":"We should refactor the login","metadata":"{\"isStreaming\":true}"}"#;
        let j: BackgroundJob = serde_json::from_str(json).unwrap();
        let r = JobClassifier::default().classify(Some(&j), &mut ledger);
        assert_eq!(r.status, JobPhase::Processing);
        assert_eq!(r.text.as_deref(), Some("We should refactor the login"));
    }

    #[test]
    fn short_or_invalid_streaming_partial_ignored() {
        let mut ledger = ProcessedJobs::new();
        let classifier = JobClassifier::default();
        let mut j = job("s2", JobStatus::Running);
        j.metadata = Some(JobMetadata { is_streaming: true });

        j.response = Some("short partial".into());
        assert_eq!(classifier.classify(Some(&j), &mut ledger), JobResult::processing());

        j.response = Some(r#"{"partial": "json fragment here"}"#.into());
        assert_eq!(classifier.classify(Some(&j), &mut ledger), JobResult::processing());
    }

    #[test]
    fn streaming_ignored_when_flag_missing() {
        let mut ledger = ProcessedJobs::new();
        let mut j = job("s3", JobStatus::Running);
        j.response = Some("A long enough partial transcription".into());
        assert_eq!(
            JobClassifier::default().classify(Some(&j), &mut ledger),
            JobResult::processing()
        );
    }

    #[test]
    fn queued_job_is_processing() {
        let mut ledger = ProcessedJobs::new();
        let r = JobClassifier::default().classify(Some(&job("q", JobStatus::Queued)), &mut ledger);
        assert_eq!(r, JobResult::processing());
    }

    #[test]
    fn ledger_mark_reports_duplicates() {
        let mut ledger = ProcessedJobs::new();
        assert!(ledger.mark("a"));
        assert!(!ledger.mark("a"));
        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn job_result_serializes_lowercase_status() {
        let json = serde_json::to_string(&JobResult::processing()).unwrap();
        assert!(json.contains(r#""status":"processing""#));
    }
}
