//! Polls a background job until the classifier reports a terminal result.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::api::{ClientError, JobSource};
use crate::error::ScribeError;
use crate::job::{JobClassifier, JobResult, ProcessedJobs};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 200;

/// Sequential job poller. Each call to [`JobPoller::poll`] is its own
/// polling session with a fresh [`ProcessedJobs`] ledger.
#[derive(Debug, Clone)]
pub struct JobPoller {
    pub interval: Duration,
    pub max_attempts: u32,
    pub classifier: JobClassifier,
}

impl Default for JobPoller {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            classifier: JobClassifier::default(),
        }
    }
}

impl JobPoller {
    pub fn new(interval: Duration, max_attempts: u32, classifier: JobClassifier) -> Self {
        Self {
            interval,
            max_attempts,
            classifier,
        }
    }

    /// Poll `job_id` until it completes or fails.
    ///
    /// Non-terminal results that carry a streaming preview or a stuck
    /// warning are handed to `observe`. A rate-limited fetch waits for the
    /// server's retry hint and still counts as an attempt.
    pub async fn poll<S, F>(
        &self,
        source: &S,
        job_id: &str,
        mut observe: F,
    ) -> Result<JobResult, ScribeError>
    where
        S: JobSource,
        F: FnMut(&JobResult),
    {
        let mut processed = ProcessedJobs::new();

        for attempt in 1..=self.max_attempts {
            let job = match source.fetch_job(job_id).await {
                Ok(Some(job)) => job,
                Ok(None) => return Err(ScribeError::JobNotFound(job_id.to_string())),
                Err(ClientError::RateLimited { retry_after_ms }) => {
                    warn!(%job_id, retry_after_ms, "rate limited while polling");
                    sleep(Duration::from_millis(retry_after_ms)).await;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let result = self.classifier.classify(Some(&job), &mut processed);
            if result.is_terminal() {
                debug!(%job_id, attempt, status = %result.status, "job settled");
                return Ok(result);
            }
            if result.text.is_some() || result.error.is_some() {
                observe(&result);
            }

            if attempt < self.max_attempts {
                sleep(self.interval).await;
            }
        }

        Err(ScribeError::PollTimeout {
            job_id: job_id.to_string(),
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{BackgroundJob, JobMetadata, JobPhase, JobStatus};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Replays a script of fetch results; the last one repeats forever.
    struct ScriptedSource {
        script: RefCell<VecDeque<Result<Option<BackgroundJob>, ClientError>>>,
        last: Option<BackgroundJob>,
        calls: Cell<u32>,
    }

    impl ScriptedSource {
        fn new(
            script: Vec<Result<Option<BackgroundJob>, ClientError>>,
            last: Option<BackgroundJob>,
        ) -> Self {
            Self {
                script: RefCell::new(script.into()),
                last,
                calls: Cell::new(0),
            }
        }
    }

    impl JobSource for ScriptedSource {
        async fn fetch_job(&self, _job_id: &str) -> Result<Option<BackgroundJob>, ClientError> {
            self.calls.set(self.calls.get() + 1);
            match self.script.borrow_mut().pop_front() {
                Some(next) => next,
                None => Ok(self.last.clone()),
            }
        }
    }

    fn job(status: JobStatus) -> BackgroundJob {
        BackgroundJob::new("job-1", status)
    }

    fn fast_poller(max_attempts: u32) -> JobPoller {
        JobPoller::new(Duration::from_millis(1), max_attempts, JobClassifier::default())
    }

    #[tokio::test]
    async fn returns_completed_text() {
        let mut done = job(JobStatus::Completed);
        done.response = Some(r#"{"text":"hello there"}"#.into());
        let source = ScriptedSource::new(
            vec![Ok(Some(job(JobStatus::Queued))), Ok(Some(job(JobStatus::Running)))],
            Some(done),
        );

        let result = fast_poller(10).poll(&source, "job-1", |_| {}).await.unwrap();
        assert_eq!(result.status, JobPhase::Completed);
        assert_eq!(result.text.as_deref(), Some("hello there"));
        assert!(result.processed);
        assert_eq!(source.calls.get(), 3);
    }

    #[tokio::test]
    async fn returns_failure_message() {
        let mut failed = job(JobStatus::Failed);
        failed.error_message = Some("model crashed".into());
        let source = ScriptedSource::new(vec![], Some(failed));

        let result = fast_poller(5).poll(&source, "job-1", |_| {}).await.unwrap();
        assert_eq!(result.status, JobPhase::Failed);
        assert_eq!(result.error.as_deref(), Some("model crashed"));
    }

    #[tokio::test]
    async fn streaming_previews_reach_the_observer() {
        let mut streaming = job(JobStatus::Running);
        streaming.metadata = Some(JobMetadata { is_streaming: true });
        streaming.response = Some("the first part of a longer sentence".into());
        let mut done = job(JobStatus::Completed);
        done.response = Some("the first part of a longer sentence, finished".into());
        let source = ScriptedSource::new(vec![Ok(Some(streaming))], Some(done));

        let mut previews = Vec::new();
        let result = fast_poller(5)
            .poll(&source, "job-1", |r| previews.push(r.text.clone()))
            .await
            .unwrap();

        assert_eq!(
            previews,
            vec![Some("the first part of a longer sentence".to_string())]
        );
        assert_eq!(result.status, JobPhase::Completed);
    }

    #[tokio::test]
    async fn times_out_when_job_never_settles() {
        let source = ScriptedSource::new(vec![], Some(job(JobStatus::Running)));
        let err = fast_poller(3).poll(&source, "job-1", |_| {}).await.unwrap_err();
        assert!(matches!(err, ScribeError::PollTimeout { attempts: 3, .. }));
        assert_eq!(source.calls.get(), 3);
    }

    #[tokio::test]
    async fn unknown_job_is_an_error() {
        let source = ScriptedSource::new(vec![], None);
        let err = fast_poller(3).poll(&source, "ghost", |_| {}).await.unwrap_err();
        assert!(matches!(err, ScribeError::JobNotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn rate_limit_waits_and_retries() {
        let mut done = job(JobStatus::Completed);
        done.response = Some("finally here".into());
        let source = ScriptedSource::new(
            vec![Err(ClientError::RateLimited { retry_after_ms: 1 })],
            Some(done),
        );

        let result = fast_poller(3).poll(&source, "job-1", |_| {}).await.unwrap();
        assert_eq!(result.text.as_deref(), Some("finally here"));
        assert_eq!(source.calls.get(), 2);
    }

    #[tokio::test]
    async fn other_client_errors_abort() {
        let source = ScriptedSource::new(
            vec![Err(ClientError::ApiError {
                status: 500,
                message: "down".into(),
            })],
            None,
        );
        let err = fast_poller(3).poll(&source, "job-1", |_| {}).await.unwrap_err();
        assert!(matches!(err, ScribeError::Client(ClientError::ApiError { status: 500, .. })));
    }
}
