use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::{
    ClientError, CorrectionRequest, CorrectionResponse, Corrector, TranscribeRequest, Transcriber,
    TranscriptionResponse,
};
use crate::job::{JobPhase, JobResult};
use crate::validation::{RejectReason, Validation, validate};

/// Which pass of the two-step flow a text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Straight out of the transcriber.
    Raw,
    /// Output of the correction pass.
    Correction,
}

/// Session-level settings shared by every request in a dictation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptionOptions {
    pub session_id: String,
    pub language: Option<String>,
    pub project_directory: Option<String>,
    pub auto_correct: bool,
}

/// One candidate text to push through the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionRequest {
    pub text: Option<String>,
    pub phase: Phase,
    /// The raw text a correction was produced from. Correction phase only.
    pub raw_text: Option<String>,
    /// Transcription job the text came from, forwarded to the corrector.
    pub job_id: Option<String>,
    pub options: TranscriptionOptions,
}

impl TranscriptionRequest {
    pub fn raw(text: Option<String>, options: TranscriptionOptions) -> Self {
        Self {
            text,
            phase: Phase::Raw,
            raw_text: None,
            job_id: None,
            options,
        }
    }

    pub fn correction(
        raw_text: Option<String>,
        corrected: Option<String>,
        options: TranscriptionOptions,
    ) -> Self {
        Self {
            text: corrected,
            phase: Phase::Correction,
            raw_text,
            job_id: None,
            options,
        }
    }

    pub fn with_job_id(mut self, job_id: Option<String>) -> Self {
        self.job_id = job_id;
        self
    }
}

/// What the flow decided. The caller (or [`super::sink`]) turns this into
/// UI state and callback invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The candidate text failed validation. `raw` is set when an accepted
    /// raw text preceded a rejected correction.
    Rejected {
        reason: RejectReason,
        raw: Option<String>,
    },
    /// Raw text accepted as final; no correction requested.
    Transcribed { text: String },
    /// Correction accepted as final.
    Corrected { raw: Option<String>, corrected: String },
    /// Correction was requested but did not materialise; raw text is final.
    FellBack { text: String, cause: String },
    /// Work continues in a background job that the caller must poll.
    AwaitingJob { raw: Option<String>, job_id: String },
    /// Unexpected failure outside the validation rules.
    Failed { error: String },
}

impl Outcome {
    /// The text the user should end up with, if the flow finished with one.
    pub fn final_text(&self) -> Option<&str> {
        match self {
            Outcome::Transcribed { text } | Outcome::FellBack { text, .. } => Some(text),
            Outcome::Corrected { corrected, .. } => Some(corrected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::AwaitingJob { .. })
    }
}

/// Drives raw transcriptions through the optional correction pass.
///
/// Holds no state between calls; every decision is returned as an
/// [`Outcome`].
pub struct TranscriptionOrchestrator<C> {
    client: C,
}

impl<C> TranscriptionOrchestrator<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: Corrector> TranscriptionOrchestrator<C> {
    /// Validate a candidate and decide what happens to it.
    ///
    /// Raw text with auto-correct enabled is sent to the corrector; a string
    /// result re-enters the flow as a correction, a background job yields
    /// [`Outcome::AwaitingJob`], anything else falls back to the raw text.
    pub async fn process(&self, req: &TranscriptionRequest) -> Outcome {
        if req.phase == Phase::Correction {
            return finish_correction(req.raw_text.clone(), req.text.as_deref());
        }

        let text = match accept(req.text.as_deref()) {
            Ok(text) => text,
            Err(reason) => return Outcome::Rejected { reason, raw: None },
        };

        if !req.options.auto_correct {
            debug!(chars = text.len(), "auto-correct disabled, raw text is final");
            return Outcome::Transcribed { text };
        }

        let correction = CorrectionRequest {
            text: text.clone(),
            language: req.options.language.clone(),
            session_id: req.options.session_id.clone(),
            transcription_job_id: req.job_id.clone(),
            project_directory: req.options.project_directory.clone(),
        };

        match self.client.correct(&correction).await {
            Ok(CorrectionResponse::Text(corrected)) => finish_correction(Some(text), Some(&corrected)),
            Ok(CorrectionResponse::BackgroundJob { job_id }) => {
                info!(%job_id, "correction deferred to background job");
                Outcome::AwaitingJob {
                    raw: Some(text),
                    job_id,
                }
            }
            Err(e) => {
                warn!(error = %e, "correction failed, using raw text");
                Outcome::FellBack {
                    text,
                    cause: e.to_string(),
                }
            }
        }
    }
}

impl<C: Transcriber + Corrector> TranscriptionOrchestrator<C> {
    /// Transcribe recorded audio and run the result through [`Self::process`].
    pub async fn handle_transcription(
        &self,
        audio: Vec<u8>,
        file_name: &str,
        options: &TranscriptionOptions,
    ) -> Outcome {
        let req = TranscribeRequest {
            audio,
            file_name: file_name.to_string(),
            language: options.language.clone(),
            session_id: options.session_id.clone(),
            project_directory: options.project_directory.clone(),
        };

        match self.client.transcribe(&req).await {
            Ok(TranscriptionResponse::Text { text, job_id }) => {
                let next = TranscriptionRequest::raw(Some(text), options.clone()).with_job_id(job_id);
                self.process(&next).await
            }
            Ok(TranscriptionResponse::BackgroundJob { job_id }) => {
                info!(%job_id, "transcription deferred to background job");
                Outcome::AwaitingJob { raw: None, job_id }
            }
            Err(e) => transcription_failure(e),
        }
    }

    /// Resolve a polled transcription job; its text starts the raw phase.
    pub async fn settle_transcription_job(
        &self,
        job_id: &str,
        result: &JobResult,
        options: &TranscriptionOptions,
    ) -> Option<Outcome> {
        match result.status {
            JobPhase::Processing => None,
            JobPhase::Completed => {
                let next = TranscriptionRequest::raw(result.text.clone(), options.clone())
                    .with_job_id(Some(job_id.to_string()));
                Some(self.process(&next).await)
            }
            JobPhase::Failed => Some(Outcome::Failed {
                error: result
                    .error
                    .clone()
                    .unwrap_or_else(|| "Operation failed".to_string()),
            }),
        }
    }
}

/// True when `process(req)` is going to call the corrector.
pub fn will_request_correction(req: &TranscriptionRequest) -> bool {
    req.phase == Phase::Raw
        && req.options.auto_correct
        && validate(req.text.as_deref()).is_valid()
}

/// Resolve a polled correction job against the raw text it corrects.
///
/// Returns `None` while the job is still processing. A job that failed
/// or finished without text falls back to the raw text.
pub fn settle_correction_job(raw: &str, result: &JobResult) -> Option<Outcome> {
    match (result.status, &result.text) {
        (JobPhase::Processing, _) => None,
        (JobPhase::Completed, Some(text)) => {
            Some(finish_correction(Some(raw.to_string()), Some(text)))
        }
        (JobPhase::Completed, None) | (JobPhase::Failed, _) => Some(Outcome::FellBack {
            text: raw.to_string(),
            cause: result
                .error
                .clone()
                .unwrap_or_else(|| "correction produced no text".to_string()),
        }),
    }
}

fn accept(text: Option<&str>) -> Result<String, RejectReason> {
    validate(text).into_result()?;
    Ok(text.unwrap_or_default().to_string())
}

fn finish_correction(raw: Option<String>, corrected: Option<&str>) -> Outcome {
    match validate(corrected) {
        Validation::Valid => Outcome::Corrected {
            raw,
            corrected: corrected.unwrap_or_default().to_string(),
        },
        Validation::Invalid(reason) => {
            warn!(%reason, "corrected text rejected");
            Outcome::Rejected { reason, raw }
        }
    }
}

fn transcription_failure(e: ClientError) -> Outcome {
    warn!(error = %e, "transcription failed");
    Outcome::Failed {
        error: e.to_string(),
    }
}
