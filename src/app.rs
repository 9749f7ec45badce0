use std::io::Read;
use std::path::Path;

use anyhow::Context;

use crate::audio::{wav_duration, AudioClip};
use crate::compose::BaseVideo;
use crate::config::{Cli, Engine};
use crate::error::CaptionError;
use crate::export::{load_background, write_overlays, write_preview};
use crate::font::FontChain;
use crate::narration::estimated_duration;
use crate::pipeline::{CaptionMode, CaptionOutcome, CaptionPipeline, CaptionSource, PipelineOptions};
use crate::segment::tokenize;
use crate::srt::write_srt;
use crate::transcribe::{OpenAiRecognizer, RecognizerConfig, SpeechRecognizer};

fn read_text(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read narration text from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// `--duration`, else the WAV header, else an estimate from the pace.
fn narration_duration(cli: &Cli, text: &str) -> anyhow::Result<f64> {
    if let Some(duration) = cli.duration {
        return Ok(duration);
    }
    if let Some(audio) = cli.audio.as_deref() {
        return wav_duration(audio);
    }
    let words = tokenize(text).len();
    let duration = estimated_duration(words, cli.pace);
    tracing::info!(
        "no audio given; assuming {duration:.2}s for {words} words at {:?} pace",
        cli.pace
    );
    Ok(duration)
}

/// A build without `local-whisper` given `--engine local` is `InvalidArgument`;
/// backends that fail to start are `TranscriptionFailed`.
fn build_recognizer(cli: &Cli) -> Result<Box<dyn SpeechRecognizer>, CaptionError> {
    let recognizer: Box<dyn SpeechRecognizer> = match cli.engine {
        #[cfg(feature = "local-whisper")]
        Engine::Local => Box::new(
            crate::transcribe::WhisperLocalRecognizer::new(
                cli.whisper_model.clone(),
                cli.whisper_model_preset.clone(),
                &crate::transcribe::ModelStore::new(&cli.models_dir),
            )
            .context("failed to initialize local whisper")
            .map_err(|err| CaptionError::TranscriptionFailed(format!("{err:#}")))?,
        ),
        #[cfg(not(feature = "local-whisper"))]
        Engine::Local => {
            return Err(CaptionError::InvalidArgument(
                "built without the `local-whisper` feature; use --engine openai".into(),
            ))
        }
        Engine::OpenAI => Box::new(
            OpenAiRecognizer::new(
                cli.openai_api_key.clone(),
                cli.openai_model.clone(),
                cli.openai_endpoint.clone(),
            )
            .context("failed to initialize OpenAI recognizer")
            .map_err(|err| CaptionError::TranscriptionFailed(format!("{err:#}")))?,
        ),
    };
    Ok(recognizer)
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let background = cli
        .background
        .as_deref()
        .map(load_background)
        .transpose()?;
    let (width, height) = background
        .as_ref()
        .map(|bg| bg.dimensions())
        .unwrap_or((cli.width, cli.height));

    let font = FontChain::with_user_fonts(&cli.fonts).resolve();

    let mut options = PipelineOptions::new(cli.mode, cli.style.style());
    options.karaoke = cli.karaoke;
    options.anchor = cli.position;
    options.max_words = cli.max_words;
    options.pattern = cli.chunk_pattern.clone();

    let outcome = match cli.mode {
        CaptionMode::Estimated => {
            let text_path = cli
                .text
                .as_deref()
                .context("--text is required in estimated mode")?;
            let text = read_text(text_path)?;
            let duration = narration_duration(&cli, &text)?;

            let base = BaseVideo::new(width, height, duration.max(0.0))?;
            let pipeline = CaptionPipeline::new(base, font, options)?;
            pipeline.run(CaptionSource::Narration {
                text: &text,
                duration,
            })?
        }
        CaptionMode::Transcribed => {
            let audio_path = cli
                .audio
                .as_deref()
                .context("--audio is required in transcribed mode")?;
            let clip = AudioClip::load(audio_path)?;
            tracing::info!(
                "loaded {} ({:.2}s at {} Hz)",
                audio_path.display(),
                clip.duration_secs(),
                clip.sample_rate_hz
            );

            let base = BaseVideo::new(width, height, clip.duration_secs())?;
            let pipeline = CaptionPipeline::new(base, font, options)?;
            let samples = clip.to_recognizer_rate();
            let config = RecognizerConfig::from_hint(&cli.language);

            match build_recognizer(&cli) {
                Ok(mut recognizer) => pipeline.run(CaptionSource::Speech {
                    recognizer: recognizer.as_mut(),
                    audio_16k_mono: &samples,
                    config: &config,
                })?,
                Err(err) if err.is_recoverable() => {
                    tracing::warn!("{err}; rendering the video without captions");
                    pipeline.uncaptioned(err)
                }
                Err(err) => return Err(err.into()),
            }
        }
    };

    write_outputs(&cli, &outcome, background.as_ref())?;
    summarize(&outcome);
    Ok(())
}

fn write_outputs(
    cli: &Cli,
    outcome: &CaptionOutcome,
    background: Option<&image::RgbaImage>,
) -> anyhow::Result<()> {
    if let Some(path) = cli.srt.as_deref() {
        write_srt(path, &outcome.captions())?;
    }
    if let Some(dir) = cli.out_dir.as_deref() {
        write_overlays(dir, &outcome.video)?;
    }
    if let Some(path) = cli.preview.as_deref() {
        write_preview(path, &outcome.video, background, cli.preview_at)?;
    }
    Ok(())
}

fn summarize(outcome: &CaptionOutcome) {
    if let Some(reason) = &outcome.fallback {
        tracing::warn!("output has no captions: {reason}");
    }
    if !outcome.skipped.is_empty() {
        tracing::warn!(
            "{} captions could not be rendered: {:?}",
            outcome.skipped.len(),
            outcome.skipped
        );
    }
    tracing::info!(
        chunks = outcome.chunks.len(),
        layers = outcome.video.layers().len(),
        duration = outcome.video.base().duration,
        "done"
    );
}
