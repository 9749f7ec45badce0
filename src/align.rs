use crate::error::CaptionError;
use crate::segment::TimedWord;
use crate::transcribe::{RecognizedSegment, RecognizerConfig, SpeechRecognizer};

/// Runs the recognizer and flattens its output into timed words.
///
/// A segment without word timestamps becomes one word spanning the whole
/// segment. Any recognizer error is reported as `TranscriptionFailed`.
pub fn align(
    recognizer: &mut dyn SpeechRecognizer,
    audio_16k_mono: &[f32],
    cfg: &RecognizerConfig,
) -> Result<Vec<TimedWord>, CaptionError> {
    let segments = recognizer
        .recognize(audio_16k_mono, cfg)
        .map_err(|err| CaptionError::TranscriptionFailed(format!("{err:#}")))?;

    let words = flatten_segments(segments);
    tracing::info!("transcribed {} words", words.len());
    Ok(words)
}

pub fn flatten_segments(segments: Vec<RecognizedSegment>) -> Vec<TimedWord> {
    let mut words = Vec::new();
    for segment in segments {
        if segment.words.is_empty() {
            let text = segment.text.trim();
            if !text.is_empty() {
                tracing::debug!(
                    start = segment.start,
                    end = segment.end,
                    "segment has no word timestamps; using it as one word"
                );
                words.push(TimedWord::new(text, segment.start, segment.end));
            }
            continue;
        }

        for word in segment.words {
            let text = word.text.trim();
            if text.is_empty() {
                continue;
            }
            words.push(TimedWord::new(text, word.start, word.end));
        }
    }
    words
}
