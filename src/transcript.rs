/*!
 * Reference transcript handling.
 *
 * The reference transcript is trusted wording without timing. It is
 * normalized once when loaded and then sliced by character offsets into
 * per-batch excerpts. Segments mark sentence and clause boundaries so
 * excerpts can be widened instead of cutting through a sentence.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

use crate::errors::ParseError;

/// Markup and SSML tags such as `<break time="1s"/>`
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*?>").unwrap());

/// Runs of whitespace, including newlines
static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Segments longer than this are split again at whitespace
const MAX_SEGMENT_CHARS: usize = 80;

/// Characters after which a segment ends
fn is_boundary_char(c: char) -> bool {
    matches!(
        c,
        '.' | '!' | '?' | ';' | ',' | ':' | '…'
            | '。' | '！' | '？' | '；' | '，' | '、' | '：'
    )
}

/// A normalized reference transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTranscript {
    text: String,
    /// Byte offset of every char, plus the total length at the end
    char_offsets: Vec<usize>,
    segments: Vec<Range<usize>>,
}

impl ReferenceTranscript {
    /// Normalize raw transcript text: strip tags, collapse whitespace, trim
    pub fn new(raw: &str) -> Result<Self, ParseError> {
        let text = Self::preprocess(raw);
        if text.is_empty() {
            return Err(ParseError::EmptyReference);
        }

        let mut char_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        char_offsets.push(text.len());
        let segments = segment(&text);

        Ok(Self { text, char_offsets, segments })
    }

    /// Normalization applied to loaded transcripts
    pub fn preprocess(raw: &str) -> String {
        let without_tags = TAG_REGEX.replace_all(raw, "");
        WHITESPACE_REGEX.replace_all(&without_tags, " ").trim().to_string()
    }

    /// The normalized text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.char_offsets.len() - 1
    }

    /// Segment boundaries as char ranges, in order and covering the text
    pub fn segments(&self) -> &[Range<usize>] {
        &self.segments
    }

    /// Text of each segment, trimmed
    pub fn segment_texts(&self) -> Vec<&str> {
        self.segments.iter().map(|r| self.slice_chars(r.clone()).trim()).collect()
    }

    /// Substring by char range, clamped to the text
    pub fn slice_chars(&self, range: Range<usize>) -> &str {
        let len = self.char_len();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        &self.text[self.char_offsets[start]..self.char_offsets[end]]
    }

    /// Widen a char range outwards to the enclosing segment boundaries
    pub fn snap_to_segments(&self, range: Range<usize>) -> Range<usize> {
        let len = self.char_len();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);

        let snapped_start = self.segments.iter()
            .find(|seg| seg.contains(&start))
            .map_or(start, |seg| seg.start);
        let snapped_end = if end == 0 {
            0
        } else {
            self.segments.iter()
                .find(|seg| seg.contains(&(end - 1)))
                .map_or(end, |seg| seg.end)
        };

        snapped_start..snapped_end.max(snapped_start)
    }
}

/// Split normalized text into segments after boundary punctuation, then
/// split long unpunctuated segments at whitespace
fn segment(text: &str) -> Vec<Range<usize>> {
    let chars: Vec<char> = text.chars().collect();
    let mut coarse = Vec::new();
    let mut start = 0;
    for (i, c) in chars.iter().enumerate() {
        if is_boundary_char(*c) {
            coarse.push(start..i + 1);
            start = i + 1;
        }
    }
    if start < chars.len() {
        coarse.push(start..chars.len());
    }

    let mut segments = Vec::with_capacity(coarse.len());
    for range in coarse {
        if range.len() <= MAX_SEGMENT_CHARS || !chars[range.clone()].iter().any(|c| c.is_whitespace()) {
            segments.push(range);
            continue;
        }
        let mut word_start = range.start;
        for i in range.clone() {
            if chars[i].is_whitespace() {
                segments.push(word_start..i + 1);
                word_start = i + 1;
            }
        }
        if word_start < range.end {
            segments.push(word_start..range.end);
        }
    }
    segments
}
