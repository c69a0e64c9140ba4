//! Error cases the driver needs to tell apart when choosing an exit code.
//!
//! Everything else travels as a plain `anyhow::Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Ctrl+C arrived during a wait. Treated as a graceful stop.
    #[error("interrupted by user")]
    Interrupted,

    /// No way to read the cursor, grab the screen or send keys on this system.
    #[error("screen capture is not available: {0}")]
    CaptureUnavailable(String),

    /// Assembly found nothing it could put into the PDF.
    #[error("no images could be added to the PDF")]
    NoImages,

    #[error("start page {start} is after end page {end}")]
    InvalidRange { start: u32, end: u32 },
}

/// Returns true if `err` (or anything in its chain) is a user interrupt.
pub fn is_interrupted(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<PipelineError>(),
            Some(PipelineError::Interrupted)
        )
    })
}
