//! Tipos de dados para requisições e respostas do servidor de transcrição.
//!
//! As structs de requisição derivam `Serialize` com chaves em camelCase,
//! como o servidor espera. As respostas passam por [`WireResponse`], que
//! aceita todos os formatos históricos e é normalizada em
//! [`TranscriptionResponse`] ou [`CorrectionResponse`].

use serde::{Deserialize, Serialize};

use super::error::ClientError;

/// Áudio a transcrever e o contexto da sessão.
#[derive(Debug, Clone)]
pub struct TranscribeRequest {
    /// Bytes do arquivo de áudio (webm, wav, mp3...).
    pub audio: Vec<u8>,
    /// Nome do arquivo enviado no formulário multipart.
    pub file_name: String,
    /// Código de idioma (ex.: "en"). `None` deixa o servidor detectar.
    pub language: Option<String>,
    pub session_id: String,
    pub project_directory: Option<String>,
}

/// Corpo da requisição de correção de texto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRequest {
    /// Texto bruto da transcrição a ser corrigido.
    pub text: String,
    pub language: Option<String>,
    pub session_id: String,
    /// Job de transcrição que originou este texto, se houver.
    pub transcription_job_id: Option<String>,
    pub project_directory: Option<String>,
}

/// Resultado normalizado de uma transcrição.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionResponse {
    /// Texto disponível imediatamente.
    Text { text: String, job_id: Option<String> },
    /// Processamento adiado; o resultado chega via polling do job.
    BackgroundJob { job_id: String },
}

/// Resultado normalizado de uma correção.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionResponse {
    /// Texto corrigido disponível imediatamente.
    Text(String),
    /// Correção adiada; o resultado chega via polling do job.
    BackgroundJob { job_id: String },
}

/// Formato bruto aceito nas respostas do servidor.
///
/// Todos os campos são opcionais porque o servidor já respondeu com
/// `text`, `correctedText` ou apenas o marcador `isBackgroundJob`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResponse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub corrected_text: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub is_background_job: bool,
}

impl WireResponse {
    fn background_job_id(&self) -> Option<String> {
        if self.is_background_job {
            self.job_id.clone().filter(|id| !id.is_empty())
        } else {
            None
        }
    }

    pub fn into_transcription(self) -> Result<TranscriptionResponse, ClientError> {
        if let Some(job_id) = self.background_job_id() {
            return Ok(TranscriptionResponse::BackgroundJob { job_id });
        }
        match self.text {
            Some(text) => Ok(TranscriptionResponse::Text {
                text,
                job_id: self.job_id,
            }),
            None => Err(ClientError::UnexpectedResponse(
                "transcription response has neither text nor job marker".into(),
            )),
        }
    }

    pub fn into_correction(self) -> Result<CorrectionResponse, ClientError> {
        if let Some(job_id) = self.background_job_id() {
            return Ok(CorrectionResponse::BackgroundJob { job_id });
        }
        match self.corrected_text.or(self.text) {
            Some(text) => Ok(CorrectionResponse::Text(text)),
            None => Err(ClientError::UnexpectedResponse(
                "correction response has neither text nor job marker".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(json: &str) -> WireResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn correction_request_uses_camel_case() {
        let req = CorrectionRequest {
            text: "hello".into(),
            language: Some("en".into()),
            session_id: "s-1".into(),
            transcription_job_id: Some("j-1".into()),
            project_directory: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""sessionId":"s-1""#));
        assert!(json.contains(r#""transcriptionJobId":"j-1""#));
        assert!(json.contains(r#""projectDirectory":null"#));
    }

    #[test]
    fn immediate_transcription() {
        let resp = wire(r#"{"text":"hello","jobId":"j-9"}"#).into_transcription().unwrap();
        assert_eq!(
            resp,
            TranscriptionResponse::Text {
                text: "hello".into(),
                job_id: Some("j-9".into())
            }
        );
    }

    #[test]
    fn deferred_transcription() {
        let resp = wire(r#"{"isBackgroundJob":true,"jobId":"j-2"}"#)
            .into_transcription()
            .unwrap();
        assert_eq!(resp, TranscriptionResponse::BackgroundJob { job_id: "j-2".into() });
    }

    #[test]
    fn background_marker_without_id_is_unexpected() {
        let err = wire(r#"{"isBackgroundJob":true}"#).into_correction().unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedResponse(_)));
    }

    #[test]
    fn corrected_text_preferred_over_text() {
        let resp = wire(r#"{"text":"raw","correctedText":"fixed"}"#)
            .into_correction()
            .unwrap();
        assert_eq!(resp, CorrectionResponse::Text("fixed".into()));
    }

    #[test]
    fn empty_object_is_unexpected() {
        assert!(wire("{}").into_transcription().is_err());
        assert!(wire("{}").into_correction().is_err());
    }
}
