use clap::ValueEnum;
use image::{imageops, RgbaImage};
use serde::Serialize;

use crate::error::CaptionError;
use crate::render::StyledImage;

/// Vertical caption placement, as a fraction of the frame height at which
/// the caption canvas' top edge sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Top,
    Center,
    Bottom,
}

impl Anchor {
    pub fn fraction(self) -> f64 {
        match self {
            Anchor::Top => 0.15,
            Anchor::Center => 0.50,
            Anchor::Bottom => 0.75,
        }
    }
}

/// The base track captions are laid over. Its timeline is the reference
/// for every overlay interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaseVideo {
    pub width: u32,
    pub height: u32,
    pub duration: f64,
}

impl BaseVideo {
    pub fn new(width: u32, height: u32, duration: f64) -> Result<Self, CaptionError> {
        if width == 0 || height == 0 {
            return Err(CaptionError::InvalidArgument(format!(
                "video frame must be non-empty, got {width}x{height}"
            )));
        }
        if !duration.is_finite() || duration < 0.0 {
            return Err(CaptionError::InvalidArgument(format!(
                "video duration must be a non-negative number, got {duration}"
            )));
        }
        Ok(Self {
            width,
            height,
            duration,
        })
    }

    pub fn blank_frame(&self) -> RgbaImage {
        RgbaImage::from_pixel(self.width, self.height, image::Rgba([0, 0, 0, 255]))
    }
}

/// A rendered caption placed on the base timeline.
#[derive(Debug, Clone)]
pub struct TimedOverlay {
    image: StyledImage,
    start: f64,
    end: f64,
    x: i64,
    y: i64,
    /// Index of the chunk this overlay belongs to; karaoke variants of one
    /// chunk share it.
    group: usize,
}

impl TimedOverlay {
    pub fn place(
        image: StyledImage,
        start: f64,
        end: f64,
        group: usize,
        anchor: Anchor,
        base: &BaseVideo,
    ) -> Self {
        let x = (base.width as i64 - image.width() as i64) / 2;
        let y = (base.height as f64 * anchor.fraction()) as i64;
        Self {
            image,
            start,
            end,
            x,
            y,
            group,
        }
    }

    pub fn image(&self) -> &StyledImage {
        &self.image
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn position(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    pub fn group(&self) -> usize {
        self.group
    }

    pub fn is_visible_at(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Base video plus caption layers, in stacking order (later layers on top).
#[derive(Debug, Clone)]
pub struct CompositeVideo {
    base: BaseVideo,
    layers: Vec<TimedOverlay>,
}

/// Layers overlays above the base video in chunk/word order.
///
/// Overlays of different chunks must not overlap in time; if an earlier
/// chunk runs past the start of the next one it is cut at that start.
/// With no overlays the base video is returned untouched.
pub fn compose(base: BaseVideo, mut overlays: Vec<TimedOverlay>) -> CompositeVideo {
    if overlays.is_empty() {
        tracing::info!("no captions to overlay; keeping the base video as is");
        return CompositeVideo {
            base,
            layers: Vec::new(),
        };
    }

    overlays.sort_by_key(|o| o.group);

    let mut group_starts: Vec<(usize, f64)> = Vec::new();
    for o in &overlays {
        match group_starts.last_mut() {
            Some((g, start)) if *g == o.group => *start = start.min(o.start),
            _ => group_starts.push((o.group, o.start)),
        }
    }

    for o in &mut overlays {
        let next_start = group_starts
            .iter()
            .find(|(g, _)| *g > o.group)
            .map(|(_, start)| *start);
        if let Some(next_start) = next_start {
            if o.end > next_start {
                tracing::debug!(
                    text = o.image.text(),
                    end = o.end,
                    next_start,
                    "trimming caption that overlaps the next chunk"
                );
                o.end = next_start;
            }
        }
    }

    let before = overlays.len();
    overlays.retain(|o| {
        let keep = o.end > o.start;
        if !keep {
            tracing::warn!("dropping zero-length caption {:?}", o.image.text());
        }
        keep
    });
    if overlays.len() != before {
        tracing::info!("{} captions left after trimming", overlays.len());
    }

    CompositeVideo {
        base,
        layers: overlays,
    }
}

impl CompositeVideo {
    pub fn base(&self) -> &BaseVideo {
        &self.base
    }

    pub fn layers(&self) -> &[TimedOverlay] {
        &self.layers
    }

    /// True when no caption layer was added.
    pub fn is_passthrough(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn active_layers(&self, t: f64) -> impl Iterator<Item = &TimedOverlay> {
        self.layers.iter().filter(move |o| o.is_visible_at(t))
    }

    /// Draws the layers visible at `t` onto `frame`, a decoded base frame.
    pub fn composite_frame(&self, t: f64, frame: &mut RgbaImage) -> Result<(), CaptionError> {
        if frame.dimensions() != (self.base.width, self.base.height) {
            return Err(CaptionError::InvalidArgument(format!(
                "frame is {}x{}, base video is {}x{}",
                frame.width(),
                frame.height(),
                self.base.width,
                self.base.height
            )));
        }
        for layer in self.active_layers(t) {
            imageops::overlay(frame, layer.image.image(), layer.x, layer.y);
        }
        Ok(())
    }
}
