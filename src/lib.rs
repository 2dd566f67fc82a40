//! Voice transcription client: validates transcribed text, reads background
//! job results and drives the optional correction pass.

pub mod api;
pub mod config;
pub mod error;
pub mod job;
pub mod poller;
pub mod transcription;
pub mod validation;
