//! Client side of the remote transcription, correction and job operations.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ApiClient, MIN_AUDIO_BYTES, check_audio};
pub use error::ClientError;
pub use types::{
    CorrectionRequest, CorrectionResponse, TranscribeRequest, TranscriptionResponse, WireResponse,
};

use crate::job::BackgroundJob;

/// Turns recorded audio into text, possibly deferring to a background job.
#[allow(async_fn_in_trait)]
pub trait Transcriber {
    async fn transcribe(&self, req: &TranscribeRequest) -> Result<TranscriptionResponse, ClientError>;
}

/// Refines raw transcribed text, possibly deferring to a background job.
#[allow(async_fn_in_trait)]
pub trait Corrector {
    async fn correct(&self, req: &CorrectionRequest) -> Result<CorrectionResponse, ClientError>;
}

/// Reads background job snapshots. `Ok(None)` means the job is unknown.
#[allow(async_fn_in_trait)]
pub trait JobSource {
    async fn fetch_job(&self, job_id: &str) -> Result<Option<BackgroundJob>, ClientError>;
}
