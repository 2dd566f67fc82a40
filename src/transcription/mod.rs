mod orchestrator;
pub mod sink;

pub use orchestrator::{
    Outcome, Phase, TranscriptionOptions, TranscriptionOrchestrator, TranscriptionRequest,
    settle_correction_job, will_request_correction,
};
pub use sink::{TextStatus, TranscriptionSink, UiUpdate};
