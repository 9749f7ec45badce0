use std::io::Cursor;
use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::multipart;
use serde::Deserialize;

use crate::audio::RECOGNIZER_SAMPLE_RATE;
use crate::transcribe::{RecognizedSegment, RecognizedWord, RecognizerConfig, SpeechRecognizer};

pub struct OpenAiRecognizer {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl OpenAiRecognizer {
    pub fn new(api_key: Option<String>, model: String, endpoint: String) -> anyhow::Result<Self> {
        let api_key =
            api_key.context("missing OpenAI API key (set --openai-api-key or OPENAI_API_KEY)")?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("captions/0.1")
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            api_key,
            model,
            endpoint,
            client,
        })
    }
}

impl SpeechRecognizer for OpenAiRecognizer {
    fn recognize(
        &mut self,
        audio_16k_mono: &[f32],
        cfg: &RecognizerConfig,
    ) -> anyhow::Result<Vec<RecognizedSegment>> {
        if audio_16k_mono.is_empty() {
            return Ok(Vec::new());
        }

        let wav = encode_wav_16k_mono_i16(audio_16k_mono)?;
        let file_part = multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .context("invalid mime")?;

        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment")
            .text("timestamp_granularities[]", "word")
            .part("file", file_part);

        if let Some(lang) = cfg.language.as_ref() {
            form = form.text("language", lang.clone());
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .with_context(|| format!("POST {}", self.endpoint))?;

        let status = resp.status();
        let body = resp.text().context("failed to read response body")?;
        if !status.is_success() {
            anyhow::bail!("transcription API error ({status}): {body}");
        }

        let parsed: VerboseTranscription =
            serde_json::from_str(&body).context("failed to parse transcription response")?;
        Ok(parsed.into_segments())
    }
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<ApiSegment>,
    #[serde(default)]
    words: Vec<ApiWord>,
}

#[derive(Debug, Deserialize)]
struct ApiSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiWord {
    word: String,
    start: f64,
    end: f64,
}

impl VerboseTranscription {
    /// The API returns words as a flat list next to the segments. Word and
    /// segment boundaries are computed separately, so each word goes to the
    /// segment it overlaps most. When a word list exists, segments that
    /// received no word are dropped.
    fn into_segments(self) -> Vec<RecognizedSegment> {
        let words: Vec<RecognizedWord> = self
            .words
            .into_iter()
            .map(|w| RecognizedWord {
                text: w.word,
                start: w.start,
                end: w.end,
            })
            .collect();

        if self.segments.is_empty() {
            if words.is_empty() && self.text.trim().is_empty() {
                return Vec::new();
            }
            let start = words.first().map(|w| w.start).unwrap_or(0.0);
            let end = words
                .last()
                .map(|w| w.end)
                .or(self.duration)
                .unwrap_or(start);
            return vec![RecognizedSegment {
                text: self.text,
                start,
                end,
                words,
            }];
        }

        let mut segments: Vec<RecognizedSegment> = self
            .segments
            .into_iter()
            .map(|s| RecognizedSegment {
                text: s.text,
                start: s.start,
                end: s.end,
                words: Vec::new(),
            })
            .collect();

        if words.is_empty() {
            return segments;
        }

        // Never step back to an earlier segment, so word order survives.
        let mut floor = 0;
        for word in words {
            let idx = owning_segment(&segments, &word).max(floor);
            floor = idx;
            segments[idx].words.push(word);
        }
        segments.retain(|s| !s.words.is_empty());
        segments
    }
}

/// Largest overlap wins; without any overlap, the closest segment does.
fn owning_segment(segments: &[RecognizedSegment], word: &RecognizedWord) -> usize {
    let overlap =
        |s: &RecognizedSegment| (s.end.min(word.end) - s.start.max(word.start)).max(0.0);
    let distance = |s: &RecognizedSegment| {
        if word.start < s.start {
            s.start - word.start
        } else if word.start > s.end {
            word.start - s.end
        } else {
            0.0
        }
    };
    segments
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            overlap(b)
                .total_cmp(&overlap(a))
                .then_with(|| distance(a).total_cmp(&distance(b)))
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn encode_wav_16k_mono_i16(audio_16k_mono: &[f32]) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: RECOGNIZER_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut bytes = Vec::new();
    {
        let cursor = Cursor::new(&mut bytes);
        let mut writer =
            hound::WavWriter::new(cursor, spec).context("failed to create WAV writer")?;

        for &s in audio_16k_mono {
            let s = s.clamp(-1.0, 1.0);
            let v = (s * i16::MAX as f32) as i16;
            writer
                .write_sample(v)
                .context("failed writing WAV sample")?;
        }
        writer.finalize().context("failed finalizing WAV")?;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nests_flat_words_under_their_segments() {
        let body = r#"{
            "task": "transcribe",
            "language": "portuguese",
            "duration": 2.1,
            "text": "oi mundo tudo bem",
            "segments": [
                {"id": 0, "start": 0.0, "end": 0.9, "text": " oi mundo"},
                {"id": 1, "start": 1.0, "end": 2.1, "text": " tudo bem"}
            ],
            "words": [
                {"word": "oi", "start": 0.0, "end": 0.4},
                {"word": "mundo", "start": 0.4, "end": 0.9},
                {"word": "tudo", "start": 1.0, "end": 1.5},
                {"word": "bem", "start": 1.5, "end": 2.1}
            ]
        }"#;
        let parsed: VerboseTranscription = serde_json::from_str(body).unwrap();
        let segments = parsed.into_segments();

        assert_eq!(segments.len(), 2);
        let first: Vec<_> = segments[0].words.iter().map(|w| w.text.as_str()).collect();
        let second: Vec<_> = segments[1].words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(first, vec!["oi", "mundo"]);
        assert_eq!(second, vec!["tudo", "bem"]);
    }

    #[test]
    fn word_starting_before_its_segment_is_not_repeated() {
        let body = r#"{
            "text": "oi mundo tudo",
            "segments": [
                {"start": 0.0, "end": 0.9, "text": " oi mundo"},
                {"start": 0.9, "end": 1.3, "text": " tudo"}
            ],
            "words": [
                {"word": "oi", "start": 0.0, "end": 0.4},
                {"word": "mundo", "start": 0.4, "end": 0.88},
                {"word": "tudo", "start": 0.88, "end": 1.3}
            ]
        }"#;
        let parsed: VerboseTranscription = serde_json::from_str(body).unwrap();
        let segments = parsed.into_segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].words.len(), 1);

        let words = crate::align::flatten_segments(segments);
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["oi", "mundo", "tudo"]);
    }

    #[test]
    fn segment_left_without_words_is_dropped() {
        let body = r#"{
            "text": "oi mundo",
            "segments": [
                {"start": 0.0, "end": 1.0, "text": " oi mundo"},
                {"start": 1.0, "end": 1.05, "text": " mundo"}
            ],
            "words": [
                {"word": "oi", "start": 0.0, "end": 0.5},
                {"word": "mundo", "start": 0.5, "end": 1.0}
            ]
        }"#;
        let parsed: VerboseTranscription = serde_json::from_str(body).unwrap();
        let words = crate::align::flatten_segments(parsed.into_segments());
        let texts: Vec<_> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["oi", "mundo"]);
    }

    #[test]
    fn segments_without_words_stay_word_less() {
        let body = r#"{"text": "oi", "segments": [{"start": 0.0, "end": 1.2, "text": "oi"}]}"#;
        let parsed: VerboseTranscription = serde_json::from_str(body).unwrap();
        let segments = parsed.into_segments();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].words.is_empty());
        assert_eq!(segments[0].end, 1.2);
    }

    #[test]
    fn words_without_segments_form_one_segment() {
        let body = r#"{"text": "oi mundo", "words": [
            {"word": "oi", "start": 0.1, "end": 0.4},
            {"word": "mundo", "start": 0.4, "end": 0.9}
        ]}"#;
        let parsed: VerboseTranscription = serde_json::from_str(body).unwrap();
        let segments = parsed.into_segments();
        assert_eq!(segments.len(), 1);
        assert_eq!((segments[0].start, segments[0].end), (0.1, 0.9));
        assert_eq!(segments[0].words.len(), 2);
    }

    #[test]
    fn silent_response_has_no_segments() {
        let parsed: VerboseTranscription = serde_json::from_str(r#"{"text": "  "}"#).unwrap();
        assert!(parsed.into_segments().is_empty());
    }

    #[test]
    fn wav_upload_has_header_and_samples() {
        let wav = encode_wav_16k_mono_i16(&[0.0, 0.5, -0.5, 1.5]).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(wav.len(), 44 + 4 * 2);
    }

    #[test]
    fn missing_key_is_rejected() {
        assert!(OpenAiRecognizer::new(None, "whisper-1".into(), "http://localhost".into()).is_err());
    }
}
