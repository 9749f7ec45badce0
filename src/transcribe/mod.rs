#[cfg(feature = "local-whisper")]
mod local_whisper;
#[cfg(feature = "local-whisper")]
mod model_download;
mod openai;

#[cfg(feature = "local-whisper")]
pub use local_whisper::WhisperLocalRecognizer;
#[cfg(feature = "local-whisper")]
pub use model_download::ModelStore;
pub use openai::OpenAiRecognizer;

/// One recognized word with its measured span in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// A recognized stretch of speech. `words` is empty when the backend
/// could not produce word-level timestamps for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub words: Vec<RecognizedWord>,
}

#[derive(Debug, Clone)]
pub struct RecognizerConfig {
    /// Language hint (`pt`, `en`, ...); `None` lets the backend detect it.
    pub language: Option<String>,
}

impl RecognizerConfig {
    /// `"auto"` (any case) or a blank hint means "detect".
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.trim();
        let language = if hint.is_empty() || hint.eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(hint.to_string())
        };
        Self { language }
    }
}

pub trait SpeechRecognizer {
    fn recognize(
        &mut self,
        audio_16k_mono: &[f32],
        cfg: &RecognizerConfig,
    ) -> anyhow::Result<Vec<RecognizedSegment>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_hint_means_detection() {
        assert_eq!(RecognizerConfig::from_hint("auto").language, None);
        assert_eq!(RecognizerConfig::from_hint(" AUTO ").language, None);
        assert_eq!(RecognizerConfig::from_hint("").language, None);
        assert_eq!(
            RecognizerConfig::from_hint(" pt ").language.as_deref(),
            Some("pt")
        );
    }
}
