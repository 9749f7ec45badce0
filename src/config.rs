use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::compose::Anchor;
use crate::narration::Pace;
use crate::pipeline::CaptionMode;
use crate::segment::ChunkPattern;
use crate::style::StylePreset;

#[derive(Debug, Clone, ValueEnum)]
pub enum Engine {
    /// On-device transcription via whisper.cpp (needs the `local-whisper` feature).
    #[value(name = "local")]
    Local,
    /// Cloud transcription via OpenAI-compatible `/v1/audio/transcriptions`.
    #[value(name = "openai", alias = "open-ai", alias = "open_ai")]
    OpenAI,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum WhisperModelPreset {
    Tiny,
    Base,
    Small,
    Medium,
    #[value(name = "large-v3", alias = "largev3", alias = "large_v3")]
    LargeV3,
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "captions",
    version,
    about = "Burned-in style captions for short vertical videos"
)]
pub struct Cli {
    /// How caption timing is obtained.
    #[arg(long, value_enum, default_value_t = CaptionMode::Transcribed)]
    pub mode: CaptionMode,

    /// Narration text file (`-` reads stdin). Required in estimated mode.
    #[arg(long)]
    pub text: Option<PathBuf>,

    /// Narration audio (WAV). Required in transcribed mode.
    #[arg(long)]
    pub audio: Option<PathBuf>,

    /// Narration length in seconds; overrides the audio duration.
    #[arg(long)]
    pub duration: Option<f64>,

    /// Speaking pace used to estimate the duration when nothing else gives it.
    #[arg(long, value_enum, default_value_t = Pace::Normal)]
    pub pace: Pace,

    /// Transcription engine to use.
    #[arg(long, value_enum, default_value_t = Engine::OpenAI)]
    pub engine: Engine,

    /// Spoken language (e.g. `pt`, `en`) or `auto`.
    #[arg(long, default_value = "pt")]
    pub language: String,

    /// Local whisper model file path. If omitted, a model will be downloaded.
    #[arg(long)]
    pub whisper_model: Option<PathBuf>,

    /// Local model preset to download when `--whisper-model` is not provided.
    #[arg(long, value_enum, default_value_t = WhisperModelPreset::Base)]
    pub whisper_model_preset: WhisperModelPreset,

    /// Where downloaded whisper models are kept.
    #[arg(long, default_value = "models")]
    pub models_dir: PathBuf,

    /// OpenAI API key (or set `OPENAI_API_KEY`).
    #[arg(long, env = "OPENAI_API_KEY")]
    pub openai_api_key: Option<String>,

    /// OpenAI model name for `/v1/audio/transcriptions` (default: `whisper-1`).
    #[arg(long, default_value = "whisper-1")]
    pub openai_model: String,

    /// OpenAI-compatible transcription endpoint.
    #[arg(long, default_value = "https://api.openai.com/v1/audio/transcriptions")]
    pub openai_endpoint: String,

    /// Caption look.
    #[arg(long, value_enum, default_value_t = StylePreset::Tiktok)]
    pub style: StylePreset,

    /// Highlight each word while it is spoken (one overlay per word).
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub karaoke: bool,

    /// Vertical placement of the captions.
    #[arg(long, value_enum, default_value_t = Anchor::Center)]
    pub position: Anchor,

    /// Font file to try before the system fonts (repeatable).
    #[arg(long = "font")]
    pub fonts: Vec<PathBuf>,

    /// Words per caption in transcribed mode.
    #[arg(long, default_value_t = 2)]
    pub max_words: usize,

    /// Alternating chunk sizes in estimated mode.
    #[arg(long, default_value = "2,3")]
    pub chunk_pattern: ChunkPattern,

    /// Base frame width in pixels.
    #[arg(long, default_value_t = 1080)]
    pub width: u32,

    /// Base frame height in pixels.
    #[arg(long, default_value_t = 1920)]
    pub height: u32,

    /// PNG frame to caption; its size replaces `--width`/`--height`.
    #[arg(long)]
    pub background: Option<PathBuf>,

    /// Write the captions as SubRip.
    #[arg(long)]
    pub srt: Option<PathBuf>,

    /// Write overlay PNGs plus `overlays.json` into this directory.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Write one composited frame as PNG.
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Timestamp (seconds) of the preview frame.
    #[arg(long, default_value_t = 0.0)]
    pub preview_at: f64,
}
