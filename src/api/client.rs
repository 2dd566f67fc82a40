use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode, Url};
use tracing::{debug, info};

use super::error::ClientError;
use super::types::{
    CorrectionRequest, CorrectionResponse, TranscribeRequest, TranscriptionResponse, WireResponse,
};
use super::{Corrector, JobSource, Transcriber};
use crate::job::BackgroundJob;

/// Audio below this size is almost always silence or a truncated recording.
pub const MIN_AUDIO_BYTES: usize = 500;

const TRANSCRIPTIONS_PATH: &str = "/api/audio/transcriptions";
const CORRECTIONS_PATH: &str = "/api/text/corrections";
const JOBS_SEGMENTS: [&str; 2] = ["api", "jobs"];

/// HTTP client for the transcription server.
pub struct ApiClient {
    api_key: Option<String>,
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or(ClientError::InvalidBaseUrl(base_url))?;
        Ok(Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            client,
            base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// `{base}/api/jobs/{id}` with the id escaped as a single path segment.
    fn job_url(&self, job_id: &str) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(JOBS_SEGMENTS)
            .push(job_id);
        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

/// Reject audio that cannot contain usable speech before uploading it.
pub fn check_audio(audio: &[u8]) -> Result<(), ClientError> {
    if audio.is_empty() {
        return Err(ClientError::AudioRejected(
            "audio is empty; nothing was recorded".into(),
        ));
    }
    if audio.len() < MIN_AUDIO_BYTES {
        return Err(ClientError::AudioRejected(format!(
            "audio is only {} bytes; the recording is likely silent or too short",
            audio.len()
        )));
    }
    Ok(())
}

/// Map 429 and other non-success statuses onto [`ClientError`].
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| secs * 1000)
            .unwrap_or(1000);
        return Err(ClientError::RateLimited {
            retry_after_ms: retry_after,
        });
    }

    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(ClientError::ApiError {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response)
}

impl Transcriber for ApiClient {
    async fn transcribe(&self, req: &TranscribeRequest) -> Result<TranscriptionResponse, ClientError> {
        check_audio(&req.audio)?;

        let mut form = Form::new()
            .part(
                "file",
                Part::bytes(req.audio.clone()).file_name(req.file_name.clone()),
            )
            .text("sessionId", req.session_id.clone());
        if let Some(language) = &req.language {
            form = form.text("language", language.clone());
        }
        if let Some(dir) = &req.project_directory {
            form = form.text("projectDirectory", dir.clone());
        }

        debug!(bytes = req.audio.len(), session_id = %req.session_id, "uploading audio");
        let response = self
            .authorize(self.client.post(self.url(TRANSCRIPTIONS_PATH)))
            .multipart(form)
            .send()
            .await?;
        let body = check_status(response).await?.json::<WireResponse>().await?;
        body.into_transcription()
    }
}

impl Corrector for ApiClient {
    async fn correct(&self, req: &CorrectionRequest) -> Result<CorrectionResponse, ClientError> {
        if req.text.trim().is_empty() {
            return Err(ClientError::EmptyText);
        }

        let response = self
            .authorize(self.client.post(self.url(CORRECTIONS_PATH)))
            .json(req)
            .send()
            .await?;

        // Servers without the correction capability answer 404/501; the raw
        // text is then the best correction available.
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::NOT_IMPLEMENTED
        ) {
            info!(status = response.status().as_u16(), "correction unavailable, keeping original text");
            return Ok(CorrectionResponse::Text(req.text.clone()));
        }

        let body = check_status(response).await?.json::<WireResponse>().await?;
        body.into_correction()
    }
}

impl JobSource for ApiClient {
    async fn fetch_job(&self, job_id: &str) -> Result<Option<BackgroundJob>, ClientError> {
        let response = self
            .authorize(self.client.get(self.job_url(job_id)?))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let job = check_status(response).await?.json::<BackgroundJob>().await?;
        Ok(Some(job))
    }
}
