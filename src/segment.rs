use serde::Serialize;

use crate::error::CaptionError;

/// A display token with a measured (or assigned) time span in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl TimedWord {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// Words meant to appear together, before any timing is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    words: Vec<String>,
}

impl Phrase {
    fn new(words: Vec<String>) -> Self {
        debug_assert!(!words.is_empty());
        Self { words }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn text(&self) -> String {
        self.words.join(" ")
    }
}

/// A non-empty run of timed words shown on screen together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    words: Vec<TimedWord>,
}

impl Chunk {
    pub fn new(words: Vec<TimedWord>) -> Result<Self, CaptionError> {
        if words.is_empty() {
            return Err(CaptionError::EmptyInput);
        }
        Ok(Self { words })
    }

    pub fn words(&self) -> &[TimedWord] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn start(&self) -> f64 {
        self.words[0].start
    }

    pub fn end(&self) -> f64 {
        self.words[self.words.len() - 1].end
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for word in &self.words {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&word.text);
        }
        out
    }

    pub fn caption(&self) -> TimedCaption {
        TimedCaption {
            start: self.start(),
            end: self.end(),
            text: self.text(),
        }
    }
}

/// The `(start, end, text)` view of a chunk, as written to timed-text files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedCaption {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Group sizes cycled over while splitting narration text.
///
/// The default `2, 3, 2, 3, ...` rhythm keeps short captions from feeling
/// monotonous; the last group takes whatever is left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPattern {
    sizes: Vec<usize>,
}

impl ChunkPattern {
    pub fn new(sizes: Vec<usize>) -> Result<Self, CaptionError> {
        if sizes.is_empty() {
            return Err(CaptionError::InvalidArgument(
                "chunk pattern needs at least one size".into(),
            ));
        }
        if sizes.contains(&0) {
            return Err(CaptionError::InvalidArgument(
                "chunk pattern sizes must be at least 1".into(),
            ));
        }
        Ok(Self { sizes })
    }

    pub fn size_at(&self, chunk_index: usize) -> usize {
        self.sizes[chunk_index % self.sizes.len()]
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }
}

impl Default for ChunkPattern {
    fn default() -> Self {
        Self { sizes: vec![2, 3] }
    }
}

impl std::str::FromStr for ChunkPattern {
    type Err = CaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sizes = s
            .split(',')
            .map(|part| {
                part.trim().parse::<usize>().map_err(|_| {
                    CaptionError::InvalidArgument(format!("bad chunk size {part:?} in {s:?}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(sizes)
    }
}

/// Collapses every whitespace run to a single space and trims the ends.
pub fn normalize(text: &str) -> String {
    tokenize(text).join(" ")
}

pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(|s| s.to_string()).collect()
}

/// Splits narration text into consecutive phrases following `pattern`.
///
/// Empty or whitespace-only text yields no phrases.
pub fn segment(text: &str, pattern: &ChunkPattern) -> Vec<Phrase> {
    let words = tokenize(text);
    let mut phrases = Vec::new();
    let mut rest = words.as_slice();
    while !rest.is_empty() {
        let take = pattern.size_at(phrases.len()).min(rest.len());
        let (head, tail) = rest.split_at(take);
        phrases.push(Phrase::new(head.to_vec()));
        rest = tail;
    }
    phrases
}

/// Groups recognized words into chunks of at most `max_words`, in order.
pub fn group(words: Vec<TimedWord>, max_words: usize) -> Result<Vec<Chunk>, CaptionError> {
    if max_words == 0 {
        return Err(CaptionError::InvalidArgument(
            "max_words must be at least 1".into(),
        ));
    }

    let mut chunks = Vec::with_capacity(words.len().div_ceil(max_words));
    let mut current = Vec::with_capacity(max_words);
    for word in words {
        current.push(word);
        if current.len() >= max_words {
            chunks.push(Chunk {
                words: std::mem::take(&mut current),
            });
        }
    }
    if !current.is_empty() {
        chunks.push(Chunk { words: current });
    }
    Ok(chunks)
}
