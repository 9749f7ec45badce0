use thiserror::Error;

/// Failure taxonomy for the caption pipeline.
///
/// Only `InvalidArgument` is meant to stop a run. Every other variant has a
/// degraded path: no captions, a skipped caption, or the built-in font.
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("no words to caption")]
    EmptyInput,

    #[error("cannot spread {duration}s over zero words (division by zero)")]
    DivisionByZero { duration: f64 },

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("failed to render caption {text:?}: {reason}")]
    RenderFailed { text: String, reason: String },

    #[error("no usable font among {tried} candidates")]
    AssetMissing { tried: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CaptionError {
    pub fn render(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RenderFailed {
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// Whether the pipeline can carry on without captions (or without this caption).
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidArgument(_))
    }
}

/// Rejects durations that cannot describe a real audio clip.
pub fn check_duration(duration: f64) -> Result<(), CaptionError> {
    if !duration.is_finite() {
        return Err(CaptionError::InvalidArgument(format!(
            "duration must be finite, got {duration}"
        )));
    }
    if duration <= 0.0 {
        return Err(CaptionError::InvalidArgument(format!(
            "duration must be positive, got {duration}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_and_non_finite_durations_are_rejected() {
        assert!(check_duration(-1.0).is_err());
        assert!(check_duration(0.0).is_err());
        assert!(check_duration(f64::NAN).is_err());
        assert!(check_duration(f64::INFINITY).is_err());
        assert!(check_duration(0.25).is_ok());
    }

    #[test]
    fn only_invalid_argument_is_fatal() {
        assert!(CaptionError::EmptyInput.is_recoverable());
        assert!(CaptionError::TranscriptionFailed("boom".into()).is_recoverable());
        assert!(CaptionError::render("oi", "bad metrics").is_recoverable());
        assert!(!CaptionError::InvalidArgument("x".into()).is_recoverable());
    }
}
