use clap::ValueEnum;
use image::Rgba;

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const YELLOW: Rgba<u8> = Rgba([255, 255, 0, 255]);
pub const GOLD: Rgba<u8> = Rgba([255, 215, 0, 255]);
pub const CHARCOAL: Rgba<u8> = Rgba([50, 50, 50, 255]);

/// Named caption looks, chosen once per render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StylePreset {
    /// Large yellow-highlighted words with a heavy outline.
    Tiktok,
    Youtube,
    Karaoke,
    /// Smaller text, gold highlight, soft grey outline.
    Minimal,
    /// White text with a black outline and no highlight color.
    Classic,
}

/// Resolved visual parameters for one render. Sizes are in pixels at the
/// 1080-px-wide reference frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionStyle {
    pub font_size: f32,
    pub stroke_width: u32,
    pub active_color: Rgba<u8>,
    pub inactive_color: Rgba<u8>,
    pub stroke_color: Rgba<u8>,
}

impl StylePreset {
    pub fn style(self) -> CaptionStyle {
        match self {
            StylePreset::Tiktok => CaptionStyle {
                font_size: 90.0,
                stroke_width: 5,
                active_color: YELLOW,
                inactive_color: WHITE,
                stroke_color: BLACK,
            },
            StylePreset::Youtube => CaptionStyle {
                font_size: 80.0,
                stroke_width: 4,
                active_color: YELLOW,
                inactive_color: WHITE,
                stroke_color: BLACK,
            },
            StylePreset::Karaoke => CaptionStyle {
                font_size: 85.0,
                stroke_width: 5,
                active_color: YELLOW,
                inactive_color: WHITE,
                stroke_color: BLACK,
            },
            StylePreset::Minimal => CaptionStyle {
                font_size: 70.0,
                stroke_width: 3,
                active_color: GOLD,
                inactive_color: WHITE,
                stroke_color: CHARCOAL,
            },
            StylePreset::Classic => CaptionStyle {
                font_size: 80.0,
                stroke_width: 4,
                active_color: WHITE,
                inactive_color: WHITE,
                stroke_color: BLACK,
            },
        }
    }
}

impl CaptionStyle {
    /// Copy scaled for a frame `scale` times the reference width.
    pub fn scaled(&self, scale: f32) -> CaptionStyle {
        let stroke = if self.stroke_width == 0 {
            0
        } else {
            ((self.stroke_width as f32 * scale).round() as u32).max(1)
        };
        CaptionStyle {
            font_size: (self.font_size * scale).max(1.0),
            stroke_width: stroke,
            ..*self
        }
    }

    pub fn word_color(&self, index: usize, active: Option<usize>) -> Rgba<u8> {
        if active == Some(index) {
            self.active_color
        } else {
            self.inactive_color
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_their_looks() {
        let tiktok = StylePreset::Tiktok.style();
        assert_eq!((tiktok.font_size, tiktok.stroke_width), (90.0, 5));
        assert_eq!(tiktok.active_color, YELLOW);

        let minimal = StylePreset::Minimal.style();
        assert_eq!(minimal.active_color, Rgba([255, 215, 0, 255]));
        assert_eq!(minimal.stroke_color, Rgba([50, 50, 50, 255]));
    }

    #[test]
    fn only_the_active_index_gets_the_active_color() {
        let style = StylePreset::Youtube.style();
        assert_eq!(style.word_color(1, Some(1)), YELLOW);
        assert_eq!(style.word_color(0, Some(1)), WHITE);
        assert_eq!(style.word_color(0, None), WHITE);
    }

    #[test]
    fn scaling_keeps_a_visible_stroke() {
        let small = StylePreset::Minimal.style().scaled(0.1);
        assert_eq!(small.stroke_width, 1);
        assert!((small.font_size - 7.0).abs() < 1e-4);

        let same = StylePreset::Tiktok.style().scaled(1.0);
        assert_eq!(same, StylePreset::Tiktok.style());
    }
}
