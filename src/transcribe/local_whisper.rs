use std::path::PathBuf;

use anyhow::Context;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::config::WhisperModelPreset;
use crate::transcribe::model_download::ModelStore;
use crate::transcribe::{RecognizedSegment, RecognizedWord, RecognizerConfig, SpeechRecognizer};

pub struct WhisperLocalRecognizer {
    ctx: WhisperContext,
    n_threads: i32,
}

impl WhisperLocalRecognizer {
    pub fn new(
        model_path: Option<PathBuf>,
        preset: WhisperModelPreset,
        store: &ModelStore,
    ) -> anyhow::Result<Self> {
        let model_path = store.resolve(model_path, &preset)?;
        tracing::info!("loading whisper model: {}", model_path.display());

        let ctx = WhisperContext::new_with_params(
            model_path
                .to_str()
                .context("model path is not valid UTF-8")?,
            WhisperContextParameters::default(),
        )
        .context("failed to load whisper model")?;

        let n_threads = std::thread::available_parallelism()
            .map(|n| n.get() as i32)
            .unwrap_or(4)
            .clamp(1, 8);

        Ok(Self { ctx, n_threads })
    }
}

impl SpeechRecognizer for WhisperLocalRecognizer {
    fn recognize(
        &mut self,
        audio_16k_mono: &[f32],
        cfg: &RecognizerConfig,
    ) -> anyhow::Result<Vec<RecognizedSegment>> {
        if audio_16k_mono.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.ctx.create_state().context("failed to create state")?;
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_n_threads(self.n_threads);
        params.set_translate(false);
        params.set_language(cfg.language.as_deref());
        params.set_token_timestamps(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, audio_16k_mono)
            .context("whisper inference failed")?;

        let mut segments = Vec::new();
        for seg in state.as_iter() {
            let text = seg.to_string();
            if text.trim().is_empty() {
                continue;
            }

            let mut pieces = Vec::new();
            for i in 0..seg.n_tokens() {
                let Some(token) = seg.get_token(i) else {
                    continue;
                };
                let piece = token
                    .to_str_lossy()
                    .context("failed to decode whisper token")?
                    .into_owned();
                let data = token.token_data();
                pieces.push(TokenPiece {
                    text: piece,
                    start: centis_to_secs(data.t0),
                    end: centis_to_secs(data.t1),
                });
            }

            segments.push(RecognizedSegment {
                text: text.trim().to_string(),
                start: centis_to_secs(seg.start_timestamp()),
                end: centis_to_secs(seg.end_timestamp()),
                words: merge_tokens_into_words(&pieces),
            });
        }
        Ok(segments)
    }
}

fn centis_to_secs(t: i64) -> f64 {
    t as f64 / 100.0
}

#[derive(Debug, Clone)]
struct TokenPiece {
    text: String,
    start: f64,
    end: f64,
}

/// Whisper tokens are sub-word pieces; a piece starting with a space opens a
/// new word. Control tokens (`[_BEG_]`, `<|endoftext|>`, ...) are dropped.
fn merge_tokens_into_words(pieces: &[TokenPiece]) -> Vec<RecognizedWord> {
    let mut words: Vec<RecognizedWord> = Vec::new();
    let mut open = false;
    for piece in pieces {
        let raw = piece.text.as_str();
        if raw.starts_with("[_") || raw.starts_with("<|") {
            continue;
        }
        let starts_word = raw.starts_with(' ') || !open;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if starts_word {
            words.push(RecognizedWord {
                text: trimmed.to_string(),
                start: piece.start,
                end: piece.end,
            });
            open = true;
        } else if let Some(last) = words.last_mut() {
            last.text.push_str(trimmed);
            last.end = piece.end;
        }
    }
    words
}
