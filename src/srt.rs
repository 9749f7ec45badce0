use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::segment::TimedCaption;

/// Formats seconds as `HH:MM:SS,mmm`, rounding to the nearest millisecond.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let s = total_secs % 60;
    let m = (total_secs / 60) % 60;
    let h = total_secs / 3600;
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

pub fn render_srt(captions: &[TimedCaption]) -> String {
    let mut out = String::new();
    for (i, caption) in captions.iter().enumerate() {
        // writing into a String cannot fail
        let _ = writeln!(out, "{}", i + 1);
        let _ = writeln!(
            out,
            "{} --> {}",
            format_timestamp(caption.start),
            format_timestamp(caption.end)
        );
        let _ = writeln!(out, "{}", caption.text);
        out.push('\n');
    }
    out
}

pub fn write_srt(path: &Path, captions: &[TimedCaption]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, render_srt(captions))
        .with_context(|| format!("failed to write subtitles to {}", path.display()))?;
    tracing::info!("wrote {} subtitle entries to {}", captions.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_zero_padded() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(4.0), "00:00:04,000");
        assert_eq!(format_timestamp(61.5), "00:01:01,500");
        assert_eq!(format_timestamp(3723.042), "01:02:03,042");
    }

    #[test]
    fn timestamps_round_instead_of_truncating() {
        assert_eq!(format_timestamp(2.9999999), "00:00:03,000");
        assert_eq!(format_timestamp(0.4), "00:00:00,400");
    }

    #[test]
    fn renders_index_timing_text_and_blank_line() {
        let captions = vec![
            TimedCaption {
                start: 0.0,
                end: 4.0,
                text: "A B".into(),
            },
            TimedCaption {
                start: 4.0,
                end: 10.0,
                text: "C D E".into(),
            },
        ];
        assert_eq!(
            render_srt(&captions),
            "1\n00:00:00,000 --> 00:00:04,000\nA B\n\n\
             2\n00:00:04,000 --> 00:00:10,000\nC D E\n\n"
        );
    }

    #[test]
    fn writes_file_creating_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.srt");
        let captions = vec![TimedCaption {
            start: 0.0,
            end: 0.9,
            text: "oi mundo".into(),
        }];
        write_srt(&path, &captions).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("1\n00:00:00,000 --> 00:00:00,900\noi mundo\n"));
    }

    #[test]
    fn no_captions_renders_empty_document() {
        assert_eq!(render_srt(&[]), "");
    }
}
