use clap::ValueEnum;

use crate::align::align;
use crate::compose::{compose, Anchor, BaseVideo, CompositeVideo, TimedOverlay};
use crate::error::{check_duration, CaptionError};
use crate::font::FontFace;
use crate::render::{CanvasSize, CaptionRenderer};
use crate::segment::{group, segment, Chunk, ChunkPattern, TimedCaption, TimedWord};
use crate::style::CaptionStyle;
use crate::timing::assign;
use crate::transcribe::{RecognizerConfig, SpeechRecognizer};

/// Frame width the style sizes and canvas heights are tuned for.
pub const REFERENCE_FRAME_WIDTH: f64 = 1080.0;
/// Share of the frame width the caption canvas spans.
pub const CANVAS_WIDTH_FRACTION: f64 = 0.95;

/// Which timing strategy produces the chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CaptionMode {
    /// Spread the narration text evenly over the audio duration.
    Estimated,
    /// Use word timestamps from a speech recognizer.
    Transcribed,
}

impl CaptionMode {
    fn reference_canvas_height(self) -> f64 {
        match self {
            CaptionMode::Estimated => 250.0,
            CaptionMode::Transcribed => 300.0,
        }
    }

    /// Word highlighted when a chunk is shown as a single image.
    fn resting_highlight(self) -> Option<usize> {
        match self {
            CaptionMode::Estimated => None,
            CaptionMode::Transcribed => Some(0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: CaptionMode,
    pub style: CaptionStyle,
    pub karaoke: bool,
    pub anchor: Anchor,
    pub max_words: usize,
    pub pattern: ChunkPattern,
}

impl PipelineOptions {
    pub fn new(mode: CaptionMode, style: CaptionStyle) -> Self {
        Self {
            mode,
            style,
            karaoke: true,
            anchor: Anchor::Center,
            max_words: 2,
            pattern: ChunkPattern::default(),
        }
    }
}

/// Where the words come from.
pub enum CaptionSource<'a> {
    Narration {
        text: &'a str,
        duration: f64,
    },
    Speech {
        recognizer: &'a mut dyn SpeechRecognizer,
        audio_16k_mono: &'a [f32],
        config: &'a RecognizerConfig,
    },
}

/// Result of a captioning run. `fallback` carries the reason when the run
/// degraded to an uncaptioned video; `skipped` lists captions that failed
/// to render.
#[derive(Debug)]
pub struct CaptionOutcome {
    pub video: CompositeVideo,
    pub chunks: Vec<Chunk>,
    pub skipped: Vec<String>,
    pub fallback: Option<CaptionError>,
}

impl CaptionOutcome {
    /// Chunk spans cut the same way `compose` cuts the overlays: a caption
    /// ends no later than the next one starts, and empty spans are left out.
    pub fn captions(&self) -> Vec<TimedCaption> {
        let mut captions: Vec<TimedCaption> = self.chunks.iter().map(Chunk::caption).collect();
        for i in 1..captions.len() {
            let next_start = captions[i].start;
            let previous = &mut captions[i - 1];
            previous.end = previous.end.min(next_start);
        }
        captions.retain(|c| c.end > c.start);
        captions
    }
}

pub struct CaptionPipeline {
    base: BaseVideo,
    options: PipelineOptions,
    style: CaptionStyle,
    renderer: CaptionRenderer,
}

impl CaptionPipeline {
    pub fn new(
        base: BaseVideo,
        font: FontFace,
        options: PipelineOptions,
    ) -> Result<Self, CaptionError> {
        if options.max_words == 0 {
            return Err(CaptionError::InvalidArgument(
                "max_words must be at least 1".into(),
            ));
        }

        let scale = base.width as f64 / REFERENCE_FRAME_WIDTH;
        let canvas = CanvasSize {
            width: ((base.width as f64 * CANVAS_WIDTH_FRACTION) as u32).max(1),
            height: ((options.mode.reference_canvas_height() * scale).round() as u32).max(1),
        };
        let style = options.style.scaled(scale as f32);
        let renderer = CaptionRenderer::new(font, canvas)?;

        Ok(Self {
            base,
            options,
            style,
            renderer,
        })
    }

    pub fn base(&self) -> &BaseVideo {
        &self.base
    }

    pub fn canvas(&self) -> CanvasSize {
        self.renderer.canvas()
    }

    /// Estimated-timing chunks for `text` spread over `duration` seconds.
    pub fn chunks_from_text(&self, text: &str, duration: f64) -> Result<Vec<Chunk>, CaptionError> {
        let phrases = segment(text, &self.options.pattern);
        if phrases.is_empty() {
            // a zero span is fine when there is nothing to time
            if !duration.is_finite() || duration < 0.0 {
                check_duration(duration)?;
            }
            return Ok(Vec::new());
        }
        assign(&phrases, duration)
    }

    pub fn chunks_from_words(&self, words: Vec<TimedWord>) -> Result<Vec<Chunk>, CaptionError> {
        group(words, self.options.max_words)
    }

    /// Renders every chunk (or, in karaoke mode, every word of every chunk)
    /// into a placed overlay. Captions that fail to render are skipped and
    /// returned by text.
    pub fn render_overlays(&self, chunks: &[Chunk]) -> (Vec<TimedOverlay>, Vec<String>) {
        let mut overlays = Vec::new();
        let mut skipped = Vec::new();

        for (group, chunk) in chunks.iter().enumerate() {
            let variants: Vec<(Option<usize>, f64, f64)> = if self.options.karaoke {
                karaoke_spans(chunk)
                    .into_iter()
                    .enumerate()
                    .map(|(i, (start, end))| (Some(i), start, end))
                    .collect()
            } else {
                vec![(
                    self.options.mode.resting_highlight(),
                    chunk.start(),
                    chunk.end(),
                )]
            };

            for (active, start, end) in variants {
                match self.renderer.render(chunk, active, &self.style) {
                    Ok(image) => overlays.push(TimedOverlay::place(
                        image,
                        start,
                        end,
                        group,
                        self.options.anchor,
                        &self.base,
                    )),
                    Err(err) => {
                        tracing::warn!("skipping caption: {err}");
                        skipped.push(chunk.text());
                    }
                }
            }
        }

        (overlays, skipped)
    }

    /// Runs the whole pipeline. Only contradictory inputs return `Err`;
    /// every other failure yields the base video without (some) captions.
    pub fn run(&self, source: CaptionSource<'_>) -> Result<CaptionOutcome, CaptionError> {
        let chunks = match source {
            CaptionSource::Narration { text, duration } => self.chunks_from_text(text, duration)?,
            CaptionSource::Speech {
                recognizer,
                audio_16k_mono,
                config,
            } => match align(recognizer, audio_16k_mono, config) {
                Ok(words) => self.chunks_from_words(words)?,
                Err(err) if err.is_recoverable() => {
                    tracing::warn!("{err}; rendering the video without captions");
                    return Ok(self.uncaptioned(err));
                }
                Err(err) => return Err(err),
            },
        };

        if chunks.is_empty() {
            tracing::info!("nothing to caption");
            return Ok(self.uncaptioned(CaptionError::EmptyInput));
        }

        let (overlays, skipped) = self.render_overlays(&chunks);
        tracing::info!(
            chunks = chunks.len(),
            overlays = overlays.len(),
            skipped = skipped.len(),
            "rendered captions"
        );

        Ok(CaptionOutcome {
            video: compose(self.base, overlays),
            chunks,
            skipped,
            fallback: None,
        })
    }

    /// The base video with no caption layers, recording why.
    pub fn uncaptioned(&self, reason: CaptionError) -> CaptionOutcome {
        CaptionOutcome {
            video: compose(self.base, Vec::new()),
            chunks: Vec::new(),
            skipped: Vec::new(),
            fallback: Some(reason),
        }
    }
}

/// Per-word display spans for karaoke. A word stays highlighted until the
/// next one starts, so the spans tile the chunk even when the recognizer
/// leaves pauses between words.
fn karaoke_spans(chunk: &Chunk) -> Vec<(f64, f64)> {
    let words = chunk.words();
    words
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let end = words.get(i + 1).map_or(chunk.end(), |next| next.start);
            (w.start, end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StylePreset;

    fn pipeline(mode: CaptionMode, karaoke: bool) -> CaptionPipeline {
        let mut options = PipelineOptions::new(mode, StylePreset::Tiktok.style());
        options.karaoke = karaoke;
        CaptionPipeline::new(
            BaseVideo::new(360, 640, 10.0).unwrap(),
            FontFace::Builtin,
            options,
        )
        .unwrap()
    }

    #[test]
    fn canvas_scales_with_the_frame() {
        let p = pipeline(CaptionMode::Transcribed, false);
        assert_eq!(p.canvas(), CanvasSize { width: 342, height: 100 });

        let full = CaptionPipeline::new(
            BaseVideo::new(1080, 1920, 1.0).unwrap(),
            FontFace::Builtin,
            PipelineOptions::new(CaptionMode::Estimated, StylePreset::Classic.style()),
        )
        .unwrap();
        assert_eq!(full.canvas(), CanvasSize { width: 1026, height: 250 });
    }

    #[test]
    fn estimated_non_karaoke_is_one_unhighlighted_image_per_chunk() {
        let p = pipeline(CaptionMode::Estimated, false);
        let outcome = p
            .run(CaptionSource::Narration {
                text: "A B C D E",
                duration: 10.0,
            })
            .unwrap();
        let layers = outcome.video.layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].image().active_word(), None);
        assert_eq!((layers[1].start(), layers[1].end()), (4.0, 10.0));
    }

    #[test]
    fn transcribed_non_karaoke_highlights_the_first_word() {
        let p = pipeline(CaptionMode::Transcribed, false);
        let chunks = p
            .chunks_from_words(vec![
                TimedWord::new("oi", 0.0, 0.4),
                TimedWord::new("mundo", 0.4, 0.9),
            ])
            .unwrap();
        let (overlays, skipped) = p.render_overlays(&chunks);
        assert!(skipped.is_empty());
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].image().active_word(), Some(0));
        assert_eq!((overlays[0].start(), overlays[0].end()), (0.0, 0.9));
    }

    #[test]
    fn karaoke_renders_one_image_per_word() {
        let p = pipeline(CaptionMode::Estimated, true);
        let chunks = p.chunks_from_text("A B C D E", 10.0).unwrap();
        let (overlays, _) = p.render_overlays(&chunks);
        assert_eq!(overlays.len(), 5);
        let groups: Vec<usize> = overlays.iter().map(TimedOverlay::group).collect();
        assert_eq!(groups, vec![0, 0, 1, 1, 1]);
        let actives: Vec<Option<usize>> = overlays.iter().map(|o| o.image().active_word()).collect();
        assert_eq!(actives, vec![Some(0), Some(1), Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn karaoke_spans_close_pauses_between_words() {
        let chunk = Chunk::new(vec![
            TimedWord::new("oi", 0.0, 0.3),
            TimedWord::new("mundo", 0.5, 0.9),
        ])
        .unwrap();
        assert_eq!(karaoke_spans(&chunk), vec![(0.0, 0.5), (0.5, 0.9)]);

        let contiguous = Chunk::new(vec![
            TimedWord::new("oi", 0.0, 0.4),
            TimedWord::new("mundo", 0.4, 0.9),
        ])
        .unwrap();
        assert_eq!(karaoke_spans(&contiguous), vec![(0.0, 0.4), (0.4, 0.9)]);
    }

    #[test]
    fn empty_text_is_an_uncaptioned_passthrough() {
        let p = pipeline(CaptionMode::Estimated, true);
        let outcome = p
            .run(CaptionSource::Narration {
                text: "   ",
                duration: 10.0,
            })
            .unwrap();
        assert!(outcome.video.is_passthrough());
        assert!(matches!(outcome.fallback, Some(CaptionError::EmptyInput)));
    }

    #[test]
    fn negative_duration_fails_before_rendering() {
        let p = pipeline(CaptionMode::Estimated, true);
        let err = p
            .run(CaptionSource::Narration {
                text: "A B",
                duration: -3.0,
            })
            .unwrap_err();
        assert!(matches!(err, CaptionError::InvalidArgument(_)));
    }

    #[test]
    fn empty_text_tolerates_a_zero_duration() {
        let p = pipeline(CaptionMode::Estimated, false);
        assert!(p.chunks_from_text("", 0.0).unwrap().is_empty());
        assert!(p.chunks_from_text("", -1.0).is_err());
        assert!(p.chunks_from_text("A", 0.0).is_err());
    }

    #[test]
    fn unrenderable_captions_are_skipped_not_fatal() {
        let mut options = PipelineOptions::new(CaptionMode::Estimated, StylePreset::Tiktok.style());
        options.style.font_size = f32::INFINITY;
        options.karaoke = false;
        let p = CaptionPipeline::new(
            BaseVideo::new(360, 640, 4.0).unwrap(),
            FontFace::Builtin,
            options,
        )
        .unwrap();
        let outcome = p
            .run(CaptionSource::Narration {
                text: "um dois três",
                duration: 4.0,
            })
            .unwrap();
        assert!(outcome.video.is_passthrough());
        assert_eq!(outcome.skipped, vec!["um dois", "três"]);
        assert_eq!(outcome.captions().len(), 2);
    }

    #[test]
    fn zero_max_words_is_rejected() {
        let mut options = PipelineOptions::new(CaptionMode::Transcribed, StylePreset::Tiktok.style());
        options.max_words = 0;
        assert!(CaptionPipeline::new(
            BaseVideo::new(360, 640, 1.0).unwrap(),
            FontFace::Builtin,
            options
        )
        .is_err());
    }
}
