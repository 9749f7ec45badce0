use crate::error::{check_duration, CaptionError};
use crate::segment::{Chunk, Phrase, TimedWord};

/// Lays phrases back to back over `[0, total_duration]`.
///
/// Each word gets the same `total_duration / word_count` slot, so a phrase
/// lasts in proportion to its word count. A chunk's start is always the
/// previous chunk's end, so the intervals tile the clip without gaps.
pub fn assign(phrases: &[Phrase], total_duration: f64) -> Result<Vec<Chunk>, CaptionError> {
    check_duration(total_duration)?;

    let total_words: usize = phrases.iter().map(Phrase::len).sum();
    if total_words == 0 {
        return Err(CaptionError::DivisionByZero {
            duration: total_duration,
        });
    }
    let time_per_word = total_duration / total_words as f64;

    let mut chunks = Vec::with_capacity(phrases.len());
    let mut assigned = 0usize;
    let mut cursor = 0.0f64;
    for phrase in phrases {
        let mut words = Vec::with_capacity(phrase.len());
        for text in phrase.words() {
            assigned += 1;
            let end = if assigned == total_words {
                total_duration
            } else {
                assigned as f64 * time_per_word
            };
            words.push(TimedWord::new(text.clone(), cursor, end));
            cursor = end;
        }
        chunks.push(Chunk::new(words)?);
    }

    tracing::debug!(
        chunks = chunks.len(),
        words = total_words,
        time_per_word,
        "assigned estimated timings"
    );
    Ok(chunks)
}
