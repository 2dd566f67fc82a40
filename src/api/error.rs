//! Erros do cliente do servidor de transcrição.
//!
//! Parte das variantes vem do transporte HTTP; as demais são rejeições
//! locais, feitas antes de qualquer requisição, para áudio sem fala e texto
//! vazio. O orquestrador trata todas como falha de transcrição ou como
//! motivo para manter o texto bruto.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP 429. `retry_after_ms` vem do cabeçalho `retry-after` (padrão 1s).
    #[error("server busy, retry in {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Qualquer outra resposta fora de 2xx, com o corpo como mensagem.
    #[error("server rejected request (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Conexão, timeout ou corpo que não decodifica.
    #[error("could not reach transcription server: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Áudio vazio ou abaixo de [`MIN_AUDIO_BYTES`](super::MIN_AUDIO_BYTES).
    #[error("audio rejected: {0}")]
    AudioRejected(String),

    #[error("no text to correct")]
    EmptyText,

    /// URL base do servidor inválida ou sem caminho hierárquico.
    #[error("invalid server URL: {0}")]
    InvalidBaseUrl(String),

    /// A resposta não tinha texto nem marcador de job em background.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}
