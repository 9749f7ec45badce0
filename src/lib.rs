pub mod align;
pub mod app;
pub mod audio;
pub mod compose;
pub mod config;
pub mod error;
pub mod export;
pub mod font;
pub mod narration;
pub mod pipeline;
pub mod render;
pub mod segment;
pub mod srt;
pub mod style;
pub mod timing;
pub mod transcribe;

pub use app::run;
pub use compose::{compose, Anchor, BaseVideo, CompositeVideo, TimedOverlay};
pub use config::{Cli, Engine};
pub use error::CaptionError;
pub use pipeline::{CaptionMode, CaptionOutcome, CaptionPipeline, CaptionSource, PipelineOptions};
pub use segment::{Chunk, TimedCaption, TimedWord};
