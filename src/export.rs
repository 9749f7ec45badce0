//! Files handed to whatever encodes the final video: one transparent PNG per
//! caption overlay, an `overlays.json` manifest with their timing and
//! placement, and optional single-frame previews.

use std::fs;
use std::path::Path;

use anyhow::Context;
use image::{ImageFormat, RgbaImage};
use serde::Serialize;

use crate::compose::{BaseVideo, CompositeVideo};

pub const MANIFEST_FILE: &str = "overlays.json";

#[derive(Debug, Clone, Serialize)]
pub struct OverlayManifest {
    pub video: BaseVideo,
    pub overlays: Vec<OverlayEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverlayEntry {
    pub file: String,
    pub start: f64,
    pub end: f64,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    pub text: String,
    pub active_word: Option<usize>,
}

fn overlay_file_name(index: usize) -> String {
    format!("caption_{index:04}.png")
}

pub fn manifest(video: &CompositeVideo) -> OverlayManifest {
    let overlays = video
        .layers()
        .iter()
        .enumerate()
        .map(|(i, layer)| {
            let (x, y) = layer.position();
            OverlayEntry {
                file: overlay_file_name(i),
                start: layer.start(),
                end: layer.end(),
                x,
                y,
                width: layer.image().width(),
                height: layer.image().height(),
                text: layer.image().text().to_string(),
                active_word: layer.image().active_word(),
            }
        })
        .collect();

    OverlayManifest {
        video: *video.base(),
        overlays,
    }
}

/// Writes every layer as PNG plus the manifest into `dir`.
pub fn write_overlays(dir: &Path, video: &CompositeVideo) -> anyhow::Result<OverlayManifest> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let manifest = manifest(video);
    for (layer, entry) in video.layers().iter().zip(&manifest.overlays) {
        let path = dir.join(&entry.file);
        layer
            .image()
            .image()
            .save_with_format(&path, ImageFormat::Png)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    let payload =
        serde_json::to_string_pretty(&manifest).context("failed to serialize overlay manifest")?;
    fs::write(&manifest_path, payload)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;

    tracing::info!(
        "wrote {} overlays to {}",
        manifest.overlays.len(),
        dir.display()
    );
    Ok(manifest)
}

pub fn load_background(path: &Path) -> anyhow::Result<RgbaImage> {
    let img = image::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(img.to_rgba8())
}

/// Composites the frame at `t` over `background` (or a black frame) and
/// saves it as PNG.
pub fn write_preview(
    path: &Path,
    video: &CompositeVideo,
    background: Option<&RgbaImage>,
    t: f64,
) -> anyhow::Result<()> {
    let mut frame = match background {
        Some(bg) => bg.clone(),
        None => video.base().blank_frame(),
    };
    video.composite_frame(t, &mut frame)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    frame
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("wrote preview frame at {t:.2}s to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, Anchor, TimedOverlay};
    use crate::font::FontFace;
    use crate::render::{CanvasSize, CaptionRenderer};
    use crate::segment::{Chunk, TimedWord};
    use crate::style::StylePreset;

    fn video() -> CompositeVideo {
        let base = BaseVideo::new(120, 200, 3.0).unwrap();
        let renderer = CaptionRenderer::new(
            FontFace::Builtin,
            CanvasSize {
                width: 114,
                height: 40,
            },
        )
        .unwrap();
        let style = StylePreset::Tiktok.style().scaled(0.2);
        let chunk = Chunk::new(vec![
            TimedWord::new("OI", 0.0, 1.0),
            TimedWord::new("TU", 1.0, 2.0),
        ])
        .unwrap();
        let overlays = (0..2)
            .map(|i| {
                let w = &chunk.words()[i];
                TimedOverlay::place(
                    renderer.render(&chunk, Some(i), &style).unwrap(),
                    w.start,
                    w.end,
                    0,
                    Anchor::Bottom,
                    &base,
                )
            })
            .collect();
        compose(base, overlays)
    }

    #[test]
    fn overlays_and_manifest_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_overlays(dir.path(), &video()).unwrap();

        assert_eq!(manifest.overlays.len(), 2);
        assert_eq!(manifest.overlays[1].file, "caption_0001.png");
        assert_eq!(manifest.overlays[1].active_word, Some(1));
        assert_eq!((manifest.overlays[0].x, manifest.overlays[0].y), (3, 150));
        assert!(dir.path().join("caption_0000.png").exists());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap())
                .unwrap();
        assert_eq!(json["video"]["width"], 120);
        assert_eq!(json["overlays"][0]["text"], "OI TU");
        assert_eq!(json["overlays"][1]["start"], 1.0);
    }

    #[test]
    fn preview_frame_has_the_base_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames/preview.png");
        write_preview(&path, &video(), None, 0.5).unwrap();

        let img = load_background(&path).unwrap();
        assert_eq!(img.dimensions(), (120, 200));
        assert!(img.pixels().any(|p| p[0] > 0));
    }

    #[test]
    fn background_of_the_wrong_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bg = RgbaImage::new(10, 10);
        assert!(write_preview(&dir.path().join("p.png"), &video(), Some(&bg), 0.5).is_err());
    }
}
