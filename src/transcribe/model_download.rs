use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use crate::config::WhisperModelPreset;

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

fn model_filename(preset: &WhisperModelPreset) -> &'static str {
    match preset {
        WhisperModelPreset::Tiny => "ggml-tiny.bin",
        WhisperModelPreset::Base => "ggml-base.bin",
        WhisperModelPreset::Small => "ggml-small.bin",
        WhisperModelPreset::Medium => "ggml-medium.bin",
        WhisperModelPreset::LargeV3 => "ggml-large-v3.bin",
    }
}

/// Directory of downloaded ggml models.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, preset: &WhisperModelPreset) -> PathBuf {
        self.dir.join(model_filename(preset))
    }

    /// A present but empty file is a leftover of an interrupted download.
    fn has(&self, preset: &WhisperModelPreset) -> bool {
        fs::metadata(self.path_for(preset))
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    /// `explicit_path` wins; otherwise the preset is fetched into the store
    /// unless it is already there.
    pub fn resolve(
        &self,
        explicit_path: Option<PathBuf>,
        preset: &WhisperModelPreset,
    ) -> anyhow::Result<PathBuf> {
        if let Some(path) = explicit_path {
            return Ok(path);
        }

        let model_path = self.path_for(preset);
        if self.has(preset) {
            return Ok(model_path);
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let url = format!("{MODEL_BASE_URL}/{}", model_filename(preset));
        tracing::info!("downloading whisper model {url} to {}", model_path.display());
        download_file(&url, &model_path)
            .with_context(|| format!("failed to download model from {url}"))?;
        Ok(model_path)
    }
}

fn download_file(url: &str, dest: &Path) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(60 * 30))
        .user_agent("captions/0.1")
        .build()
        .context("failed to build HTTP client")?;

    let mut resp = client
        .get(url)
        .send()
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url} returned error"))?;
    if let Some(len) = resp.content_length() {
        tracing::info!("model size: {:.1} MiB", len as f64 / (1024.0 * 1024.0));
    }

    let tmp_path = dest.with_extension("download");
    let mut tmp = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create temp file {}", tmp_path.display()))?;
    let written = io::copy(&mut resp, &mut tmp).context("failed downloading model file")?;
    tmp.flush().context("failed to flush model file")?;
    if written == 0 {
        anyhow::bail!("server returned an empty body for {url}");
    }

    fs::rename(&tmp_path, dest).with_context(|| {
        format!("failed to move {} to {}", tmp_path.display(), dest.display())
    })?;
    Ok(())
}
