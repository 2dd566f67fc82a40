use thiserror::Error;

use crate::api::ClientError;

#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {job_id} still running after {attempts} polls")]
    PollTimeout { job_id: String, attempts: u32 },

    #[error("Server error: {0}")]
    Client(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_timeout_display() {
        let err = ScribeError::PollTimeout {
            job_id: "job-1".into(),
            attempts: 30,
        };
        assert_eq!(err.to_string(), "Job job-1 still running after 30 polls");
    }

    #[test]
    fn client_errors_convert() {
        let err: ScribeError = ClientError::EmptyText.into();
        assert!(matches!(err, ScribeError::Client(ClientError::EmptyText)));
        assert_eq!(err.to_string(), "Server error: no text to correct");
    }
}
