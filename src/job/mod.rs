mod classifier;
mod model;
mod payload;

pub use classifier::{
    DEFAULT_STUCK_AFTER, JobClassifier, JobPhase, JobResult, ProcessedJobs, STUCK_JOB_WARNING,
};
pub use model::{BackgroundJob, JobMetadata, JobStatus, VOICE_CORRECTION_TASK};
pub use payload::{Payload, TEXT_FIELDS, clean_text, extract, strip_correction_prefix};
