use image::{Pixel, Rgba, RgbaImage};

use crate::error::CaptionError;
use crate::font::{FontFace, GlyphMask};
use crate::segment::Chunk;
use crate::style::CaptionStyle;

/// One rasterized caption: a transparent canvas with a single line of words.
#[derive(Debug, Clone)]
pub struct StyledImage {
    image: RgbaImage,
    text: String,
    active_word: Option<usize>,
}

impl StyledImage {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn active_word(&self) -> Option<usize> {
        self.active_word
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

pub struct CaptionRenderer {
    font: FontFace,
    canvas: CanvasSize,
}

impl CaptionRenderer {
    pub fn new(font: FontFace, canvas: CanvasSize) -> Result<Self, CaptionError> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(CaptionError::InvalidArgument(format!(
                "caption canvas must be non-empty, got {}x{}",
                canvas.width, canvas.height
            )));
        }
        Ok(Self { font, canvas })
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Draws every word of `chunk` on one centred line. The word at
    /// `active_word` gets the style's active color, the rest the inactive one.
    pub fn render(
        &self,
        chunk: &Chunk,
        active_word: Option<usize>,
        style: &CaptionStyle,
    ) -> Result<StyledImage, CaptionError> {
        let px = style.font_size;
        let words = chunk.words();

        let masks = words
            .iter()
            .map(|w| self.font.rasterize(&w.text, px))
            .collect::<Result<Vec<_>, _>>()?;
        let advances: Vec<f32> = words.iter().map(|w| self.font.advance(&w.text, px)).collect();
        let space = self.font.advance(" ", px);

        let line_width = advances.iter().sum::<f32>() + space * (words.len() - 1) as f32;
        let line = self.font.line_metrics(px);
        if !line_width.is_finite() || !line.height().is_finite() {
            return Err(CaptionError::render(chunk.text(), "non-finite text metrics"));
        }

        let start_x = ((self.canvas.width as f32 - line_width) / 2.0).floor() as i32;
        let top = ((self.canvas.height as f32 - line.height()) / 2.0).floor() as i32;
        let baseline = top + line.ascent.round() as i32;

        let mut image = RgbaImage::new(self.canvas.width, self.canvas.height);
        let radius = style.stroke_width as i32;
        let mut cursor = start_x as f32;

        for (i, (mask, advance)) in masks.iter().zip(&advances).enumerate() {
            let x = cursor.round() as i32 + mask.left;
            let y = baseline + mask.top;

            for (dx, dy) in stroke_offsets(radius) {
                stamp(&mut image, mask, x + dx, y + dy, style.stroke_color);
            }
            stamp(&mut image, mask, x, y, style.word_color(i, active_word));

            cursor += advance + space;
        }

        Ok(StyledImage {
            image,
            text: chunk.text(),
            active_word,
        })
    }
}

/// Integer offsets inside the disc `dx² + dy² <= r²`, centre included.
pub fn stroke_offsets(radius: i32) -> Vec<(i32, i32)> {
    let r2 = radius * radius;
    let mut offsets = Vec::new();
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

fn stamp(image: &mut RgbaImage, mask: &GlyphMask, x: i32, y: i32, color: Rgba<u8>) {
    if mask.is_empty() {
        return;
    }
    let (w, h) = (image.width() as i32, image.height() as i32);
    for my in 0..mask.height {
        let py = y + my as i32;
        if py < 0 || py >= h {
            continue;
        }
        for mx in 0..mask.width {
            let px = x + mx as i32;
            if px < 0 || px >= w {
                continue;
            }
            let coverage = mask.at(mx, my);
            if coverage == 0 {
                continue;
            }
            let alpha = (color[3] as u16 * coverage as u16 / 255) as u8;
            let src = Rgba([color[0], color[1], color[2], alpha]);
            image.get_pixel_mut(px as u32, py as u32).blend(&src);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::TimedWord;
    use crate::style::{StylePreset, BLACK, WHITE, YELLOW};

    fn chunk(words: &[&str]) -> Chunk {
        Chunk::new(
            words
                .iter()
                .enumerate()
                .map(|(i, w)| TimedWord::new(*w, i as f64, i as f64 + 1.0))
                .collect(),
        )
        .unwrap()
    }

    fn renderer() -> CaptionRenderer {
        CaptionRenderer::new(
            FontFace::Builtin,
            CanvasSize {
                width: 600,
                height: 120,
            },
        )
        .unwrap()
    }

    fn count(image: &RgbaImage, color: Rgba<u8>) -> usize {
        image.pixels().filter(|p| **p == color).count()
    }

    #[test]
    fn disc_offsets_follow_the_circle_predicate() {
        assert_eq!(stroke_offsets(0), vec![(0, 0)]);
        assert_eq!(stroke_offsets(1).len(), 5);
        // 5x5 square minus the 12 cells outside the radius-2 disc
        assert_eq!(stroke_offsets(2).len(), 13);
        assert!(stroke_offsets(5).iter().all(|(x, y)| x * x + y * y <= 25));
        assert!(!stroke_offsets(5).contains(&(5, 1)));
        assert!(stroke_offsets(5).contains(&(3, 4)));
    }

    #[test]
    fn canvas_matches_requested_size_and_stays_transparent_outside_text() {
        let style = StylePreset::Tiktok.style().scaled(0.3);
        let img = renderer().render(&chunk(&["OI"]), None, &style).unwrap();
        assert_eq!((img.width(), img.height()), (600, 120));
        assert_eq!(*img.image().get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*img.image().get_pixel(599, 119), Rgba([0, 0, 0, 0]));
        assert!(count(img.image(), BLACK) > 0);
        assert!(count(img.image(), WHITE) > 0);
    }

    #[test]
    fn active_word_is_drawn_in_the_active_color() {
        let style = StylePreset::Tiktok.style().scaled(0.3);
        let r = renderer();
        let none = r.render(&chunk(&["OI", "MUNDO"]), None, &style).unwrap();
        let first = r.render(&chunk(&["OI", "MUNDO"]), Some(0), &style).unwrap();
        let second = r.render(&chunk(&["OI", "MUNDO"]), Some(1), &style).unwrap();

        assert_eq!(count(none.image(), YELLOW), 0);
        assert!(count(first.image(), YELLOW) > 0);
        assert!(count(second.image(), YELLOW) > count(first.image(), YELLOW));
        assert_eq!(second.active_word(), Some(1));
        assert_eq!(second.text(), "OI MUNDO");
    }

    #[test]
    fn text_is_horizontally_centred() {
        let style = StylePreset::Classic.style().scaled(0.25);
        let img = renderer().render(&chunk(&["HI"]), None, &style).unwrap();
        let xs: Vec<u32> = img
            .image()
            .enumerate_pixels()
            .filter(|(_, _, p)| p[3] > 0)
            .map(|(x, _, _)| x)
            .collect();
        let min = *xs.iter().min().unwrap() as i32;
        let max = *xs.iter().max().unwrap() as i32;
        let left_margin = min;
        let right_margin = 599 - max;
        // "HI" has one trailing column of cell spacing folded into the advance
        assert!((left_margin - right_margin).abs() <= 8, "{left_margin} vs {right_margin}");
    }

    #[test]
    fn stroke_extends_beyond_the_fill() {
        let thin = StylePreset::Classic.style().scaled(0.25);
        let mut thick = thin;
        thick.stroke_width = 4;
        let r = renderer();
        let a = r.render(&chunk(&["OI"]), None, &thin).unwrap();
        let b = r.render(&chunk(&["OI"]), None, &thick).unwrap();
        let opaque = |img: &StyledImage| img.image().pixels().filter(|p| p[3] > 0).count();
        assert!(opaque(&b) > opaque(&a));
    }

    #[test]
    fn empty_canvas_is_rejected() {
        assert!(CaptionRenderer::new(
            FontFace::Builtin,
            CanvasSize {
                width: 0,
                height: 10
            }
        )
        .is_err());
    }
}
