//! Callback-style driver on top of the pure orchestrator.
//!
//! UI layers that want setter/callback semantics implement
//! [`TranscriptionSink`] and call [`run`] or [`run_audio`]. Callback errors
//! are logged and swallowed one by one; a failing state update turns the
//! whole run into a generic error state rather than leaving it loading.

use tracing::{debug, info, warn};

use super::orchestrator::{
    Outcome, TranscriptionOptions, TranscriptionOrchestrator, TranscriptionRequest,
    will_request_correction,
};
use crate::api::{Corrector, Transcriber};

pub const GENERIC_ERROR: &str = "An unexpected error occurred while processing the transcription";

/// Progress indicator for the text being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStatus {
    Idle,
    Loading,
    Done,
    Error,
}

/// A single UI state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiUpdate {
    RawText(String),
    CorrectedText(String),
    Error(String),
    Status(TextStatus),
}

/// Receiver of UI updates and completion hooks.
pub trait TranscriptionSink {
    fn update(&mut self, update: UiUpdate) -> anyhow::Result<()>;

    fn on_transcribed(&mut self, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_correction_complete(&mut self, _raw: Option<&str>, _corrected: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Process one candidate text and push the result into `sink`.
pub async fn run<C, S>(
    orchestrator: &TranscriptionOrchestrator<C>,
    req: &TranscriptionRequest,
    sink: &mut S,
) -> Outcome
where
    C: Corrector,
    S: TranscriptionSink,
{
    if will_request_correction(req)
        && let Err(e) = show_pending_raw(req, sink)
    {
        return fail_generic(sink, &e);
    }

    let outcome = orchestrator.process(req).await;
    apply(&outcome, sink)
}

// The raw text is visible while its correction is in flight.
fn show_pending_raw<S: TranscriptionSink>(req: &TranscriptionRequest, sink: &mut S) -> anyhow::Result<()> {
    if let Some(raw) = &req.text {
        sink.update(UiUpdate::RawText(raw.clone()))?;
    }
    sink.update(UiUpdate::Status(TextStatus::Loading))
}

/// Transcribe audio and push the result into `sink`.
pub async fn run_audio<C, S>(
    orchestrator: &TranscriptionOrchestrator<C>,
    audio: Vec<u8>,
    file_name: &str,
    options: &TranscriptionOptions,
    sink: &mut S,
) -> Outcome
where
    C: Transcriber + Corrector,
    S: TranscriptionSink,
{
    if let Err(e) = sink.update(UiUpdate::Status(TextStatus::Loading)) {
        return fail_generic(sink, &e);
    }
    let outcome = orchestrator
        .handle_transcription(audio, file_name, options)
        .await;
    apply(&outcome, sink)
}

/// Apply an outcome to `sink`. Returns the outcome actually delivered,
/// which is [`Outcome::Failed`] if a state update failed.
pub fn apply<S: TranscriptionSink>(outcome: &Outcome, sink: &mut S) -> Outcome {
    match deliver(outcome, sink) {
        Ok(()) => outcome.clone(),
        Err(e) => fail_generic(sink, &e),
    }
}

fn deliver<S: TranscriptionSink>(outcome: &Outcome, sink: &mut S) -> anyhow::Result<()> {
    match outcome {
        Outcome::Rejected { reason, raw } => {
            if let Some(raw) = raw {
                sink.update(UiUpdate::RawText(raw.clone()))?;
            }
            sink.update(UiUpdate::Error(reason.to_string()))?;
            sink.update(UiUpdate::Status(TextStatus::Error))?;
        }
        Outcome::Transcribed { text } => {
            sink.update(UiUpdate::RawText(text.clone()))?;
            notify_transcribed(sink, text);
            sink.update(UiUpdate::Status(TextStatus::Done))?;
        }
        Outcome::Corrected { raw, corrected } => {
            if let Some(raw) = raw {
                sink.update(UiUpdate::RawText(raw.clone()))?;
            }
            sink.update(UiUpdate::CorrectedText(corrected.clone()))?;
            if let Err(e) = sink.on_correction_complete(raw.as_deref(), corrected) {
                warn!(error = %e, "on_correction_complete callback failed");
            }
            notify_transcribed(sink, corrected);
            sink.update(UiUpdate::Status(TextStatus::Done))?;
        }
        Outcome::FellBack { text, cause } => {
            debug!(%cause, "delivering raw text after failed correction");
            sink.update(UiUpdate::RawText(text.clone()))?;
            notify_transcribed(sink, text);
            sink.update(UiUpdate::Status(TextStatus::Done))?;
        }
        Outcome::AwaitingJob { raw, job_id } => {
            if let Some(raw) = raw {
                sink.update(UiUpdate::RawText(raw.clone()))?;
            }
            info!(%job_id, "waiting for background job");
        }
        Outcome::Failed { error } => {
            sink.update(UiUpdate::Error(error.clone()))?;
            sink.update(UiUpdate::Status(TextStatus::Error))?;
        }
    }
    Ok(())
}

fn notify_transcribed<S: TranscriptionSink>(sink: &mut S, text: &str) {
    if let Err(e) = sink.on_transcribed(text) {
        warn!(error = %e, "on_transcribed callback failed");
    }
}

fn fail_generic<S: TranscriptionSink>(sink: &mut S, cause: &anyhow::Error) -> Outcome {
    warn!(error = %cause, "ui update failed, reporting generic error");
    // Best effort: the sink already failed once.
    let _ = sink.update(UiUpdate::Error(GENERIC_ERROR.to_string()));
    let _ = sink.update(UiUpdate::Status(TextStatus::Error));
    Outcome::Failed {
        error: GENERIC_ERROR.to_string(),
    }
}
