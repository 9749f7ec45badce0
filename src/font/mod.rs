mod builtin;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use fontdue::{Font, FontSettings};

use crate::error::CaptionError;

/// Bold faces first, then regular ones, across the usual install locations.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "arialbd.ttf",
    "C:/Windows/Fonts/arialbd.ttf",
    "C:/Windows/Fonts/arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

/// Ordered font files to try; the first one that loads wins.
#[derive(Debug, Clone, Default)]
pub struct FontChain {
    candidates: Vec<PathBuf>,
}

impl FontChain {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// User-supplied fonts, then the system candidates.
    pub fn with_user_fonts(user: &[PathBuf]) -> Self {
        let candidates = user
            .iter()
            .cloned()
            .chain(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from))
            .collect();
        Self { candidates }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Never fails: with no loadable candidate the built-in font is used.
    pub fn resolve(&self) -> FontFace {
        for path in &self.candidates {
            match load_font_file(path) {
                Ok(font) => {
                    tracing::info!("using caption font {}", path.display());
                    return FontFace::Vector(font);
                }
                Err(err) => tracing::debug!("font candidate skipped: {err:#}"),
            }
        }

        let missing = CaptionError::AssetMissing {
            tried: self.candidates.len(),
        };
        tracing::warn!("{missing}; falling back to the built-in bitmap font");
        FontFace::Builtin
    }
}

fn load_font_file(path: &Path) -> anyhow::Result<Font> {
    let bytes = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    Font::from_bytes(bytes, FontSettings::default())
        .map_err(|err| anyhow::anyhow!("cannot parse {}: {err}", path.display()))
}

/// Vertical metrics in pixels; both values are distances from the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
}

impl LineMetrics {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// Coverage bitmap of one word, positioned relative to the pen origin on
/// the baseline: `left` is the x offset, `top` the (usually negative) y
/// offset of the first row.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    pub coverage: Vec<u8>,
}

impl GlyphMask {
    fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            left: 0,
            top: 0,
            coverage: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn at(&self, x: u32, y: u32) -> u8 {
        self.coverage[(y * self.width + x) as usize]
    }
}

pub enum FontFace {
    Vector(Font),
    Builtin,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontFace::Vector(_) => f.write_str("FontFace::Vector"),
            FontFace::Builtin => f.write_str("FontFace::Builtin"),
        }
    }
}

impl FontFace {
    pub fn is_builtin(&self) -> bool {
        matches!(self, FontFace::Builtin)
    }

    pub fn line_metrics(&self, px: f32) -> LineMetrics {
        match self {
            FontFace::Vector(font) => match font.horizontal_line_metrics(px) {
                Some(m) if m.ascent.is_finite() && m.descent.is_finite() => LineMetrics {
                    ascent: m.ascent,
                    descent: -m.descent,
                },
                _ => LineMetrics {
                    ascent: px * 0.8,
                    descent: px * 0.2,
                },
            },
            FontFace::Builtin => {
                let s = builtin::scale_for(px) as f32;
                LineMetrics {
                    ascent: builtin::ROWS as f32 * s,
                    descent: s,
                }
            }
        }
    }

    /// Horizontal pen advance for `text`, including kerning.
    pub fn advance(&self, text: &str, px: f32) -> f32 {
        match self {
            FontFace::Vector(font) => {
                let mut pen = 0.0f32;
                let mut prev: Option<char> = None;
                for c in text.chars() {
                    if let Some(p) = prev {
                        pen += font.horizontal_kern(p, c, px).unwrap_or(0.0);
                    }
                    pen += font.metrics(c, px).advance_width;
                    prev = Some(c);
                }
                pen
            }
            FontFace::Builtin => {
                let s = builtin::scale_for(px);
                (text.chars().count() as u32 * builtin::ADVANCE * s) as f32
            }
        }
    }

    /// Rasterizes `text` as one coverage mask.
    pub fn rasterize(&self, text: &str, px: f32) -> Result<GlyphMask, CaptionError> {
        if !px.is_finite() || px <= 0.0 {
            return Err(CaptionError::render(text, format!("invalid font size {px}")));
        }
        match self {
            FontFace::Vector(font) => rasterize_vector(font, text, px),
            FontFace::Builtin => Ok(rasterize_builtin(text, px)),
        }
    }
}

struct PlacedGlyph {
    left: i32,
    top: i32,
    width: u32,
    height: u32,
    bitmap: Vec<u8>,
}

fn rasterize_vector(font: &Font, text: &str, px: f32) -> Result<GlyphMask, CaptionError> {
    let mut placed = Vec::new();
    let mut pen = 0.0f32;
    let mut prev: Option<char> = None;

    for c in text.chars() {
        if let Some(p) = prev {
            pen += font.horizontal_kern(p, c, px).unwrap_or(0.0);
        }
        let (metrics, bitmap) = font.rasterize(c, px);
        if !metrics.advance_width.is_finite() || bitmap.len() != metrics.width * metrics.height {
            return Err(CaptionError::render(
                text,
                format!("malformed glyph metrics for {c:?}"),
            ));
        }
        if metrics.width > 0 && metrics.height > 0 {
            placed.push(PlacedGlyph {
                left: pen.round() as i32 + metrics.xmin,
                top: -(metrics.ymin + metrics.height as i32),
                width: metrics.width as u32,
                height: metrics.height as u32,
                bitmap,
            });
        }
        pen += metrics.advance_width;
        prev = Some(c);
    }

    Ok(merge_glyphs(&placed))
}

fn rasterize_builtin(text: &str, px: f32) -> GlyphMask {
    let s = builtin::scale_for(px);
    let cell = builtin::ADVANCE * s;
    let mut placed = Vec::new();

    for (i, c) in text.chars().enumerate() {
        let rows = builtin::glyph_rows(c);
        let width = builtin::COLS * s;
        let height = builtin::ROWS * s;
        let mut bitmap = vec![0u8; (width * height) as usize];
        for row in 0..builtin::ROWS {
            for col in 0..builtin::COLS {
                if !builtin::is_set(&rows, col, row) {
                    continue;
                }
                for y in row * s..(row + 1) * s {
                    let start = (y * width + col * s) as usize;
                    bitmap[start..start + s as usize].fill(255);
                }
            }
        }
        if bitmap.iter().any(|&a| a > 0) {
            placed.push(PlacedGlyph {
                left: (i as u32 * cell) as i32,
                top: -(height as i32),
                width,
                height,
                bitmap,
            });
        }
    }

    merge_glyphs(&placed)
}

fn merge_glyphs(placed: &[PlacedGlyph]) -> GlyphMask {
    let Some(first) = placed.first() else {
        return GlyphMask::empty();
    };

    let mut min_x = first.left;
    let mut min_y = first.top;
    let mut max_x = first.left + first.width as i32;
    let mut max_y = first.top + first.height as i32;
    for g in placed {
        min_x = min_x.min(g.left);
        min_y = min_y.min(g.top);
        max_x = max_x.max(g.left + g.width as i32);
        max_y = max_y.max(g.top + g.height as i32);
    }

    let width = (max_x - min_x) as u32;
    let height = (max_y - min_y) as u32;
    let mut coverage = vec![0u8; (width * height) as usize];
    for g in placed {
        let ox = (g.left - min_x) as u32;
        let oy = (g.top - min_y) as u32;
        for y in 0..g.height {
            for x in 0..g.width {
                let src = g.bitmap[(y * g.width + x) as usize];
                let dst = &mut coverage[((oy + y) * width + ox + x) as usize];
                *dst = (*dst).max(src);
            }
        }
    }

    GlyphMask {
        width,
        height,
        left: min_x,
        top: min_y,
        coverage,
    }
}
