use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use log::{debug, warn};
use serde::Serialize;

use crate::errors::ParseError;

// @module: Subtitle track model and SRT wire format

// @const: SRT time-range line regex
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{2,}):(\d{2}):(\d{2}),(\d{3})\s*-->\s*(\d{2,}):(\d{2}):(\d{2}),(\d{3})\s*$").unwrap()
});

// @const: Byte order mark some editors prepend
const BOM: char = '\u{feff}';

// @struct: Single timed subtitle cue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleCue {
    // @field: 1-based cue index
    pub index: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Text lines, never blank
    pub lines: Vec<String>,
}

impl SubtitleCue {
    /// Creates a cue from free text; lines are trimmed and blank lines dropped
    pub fn new(index: usize, start_time_ms: u64, end_time_ms: u64, text: &str) -> Self {
        SubtitleCue {
            index,
            start_time_ms,
            end_time_ms,
            lines: normalize_lines(text),
        }
    }

    /// Copy of this cue with the same index and timing but different text
    pub fn with_lines(&self, lines: Vec<String>) -> Self {
        SubtitleCue {
            index: self.index,
            start_time_ms: self.start_time_ms,
            end_time_ms: self.end_time_ms,
            lines,
        }
    }

    /// Cue text with lines joined by `\n`
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Number of characters in the cue text, line breaks excluded
    pub fn char_len(&self) -> usize {
        self.lines.iter().map(|l| l.chars().count()).sum()
    }

    /// Timing as a `(start, end)` pair
    pub fn timing(&self) -> (u64, u64) {
        (self.start_time_ms, self.end_time_ms)
    }

    /// Parse an SRT timestamp (`HH:MM:SS,mmm`) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Option<u64> {
        let (clock, millis) = timestamp.trim().split_once(',')?;
        let mut parts = clock.split(':');
        let hours = parts.next()?;
        let minutes = parts.next()?;
        let seconds = parts.next()?;
        if parts.next().is_some() || hours.len() < 2 || minutes.len() != 2 || seconds.len() != 2 || millis.len() != 3 {
            return None;
        }

        let hours: u64 = parse_digits(hours)?;
        let minutes: u64 = parse_digits(minutes)?;
        let seconds: u64 = parse_digits(seconds)?;
        let millis: u64 = parse_digits(millis)?;

        if minutes >= 60 || seconds >= 60 {
            return None;
        }

        hours.checked_mul(3_600_000)?
            .checked_add(minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Whether a text line would be read back as a time-range line
    pub fn is_timing_line(line: &str) -> bool {
        TIMING_REGEX.is_match(line)
    }
}

impl fmt::Display for SubtitleCue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)
    }
}

/// Split text into trimmed, non-blank lines. Accepts `\n` and `\r\n`.
pub fn normalize_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// Ordered sequence of cues with contiguous 1-based indices.
///
/// A track is only ever built by [`SubtitleTrack::parse`] or from cues that
/// survive a serialize/parse round trip, so every track serializes losslessly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SubtitleTrack {
    cues: Vec<SubtitleCue>,
}

impl SubtitleTrack {
    /// Parse SRT text. Whitespace-only input yields an empty track.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let raw = raw.strip_prefix(BOM).unwrap_or(raw);
        // `lines()` strips both `\n` and `\r\n`
        let lines: Vec<&str> = raw.lines().collect();

        let mut cues: Vec<SubtitleCue> = Vec::new();
        let mut pos = 0;

        while pos < lines.len() {
            if lines[pos].trim().is_empty() {
                pos += 1;
                continue;
            }

            // Index line
            let index_line = pos + 1;
            let index = parse_index_line(lines[pos], index_line)?;
            let expected = cues.len() + 1;
            if index != expected {
                return Err(ParseError::NonSequentialIndex { line: index_line, expected, found: index });
            }
            pos += 1;

            // Time-range line
            let timing_line = pos + 1;
            let Some(raw_timing) = lines.get(pos).filter(|l| !l.trim().is_empty()) else {
                return Err(ParseError::MissingTiming { line: timing_line, index });
            };
            let (start_ms, end_ms) = parse_timing_line(raw_timing, timing_line)?;
            if end_ms <= start_ms {
                return Err(ParseError::InvalidTimeRange { line: timing_line, index, start_ms, end_ms });
            }
            if let Some(previous) = cues.last() {
                if start_ms < previous.start_time_ms {
                    return Err(ParseError::StartTimeRegression {
                        line: timing_line,
                        index,
                        start_ms,
                        previous_ms: previous.start_time_ms,
                    });
                }
            }
            pos += 1;

            // Text lines up to the blank separator
            let mut text_lines = Vec::new();
            while let Some(line) = lines.get(pos).filter(|l| !l.trim().is_empty()) {
                if SubtitleCue::is_timing_line(line) {
                    return Err(ParseError::AmbiguousTextLine { line: pos + 1, index });
                }
                text_lines.push(line.trim().to_string());
                pos += 1;
            }
            if text_lines.is_empty() {
                return Err(ParseError::MissingText { line: pos + 1, index });
            }

            cues.push(SubtitleCue {
                index,
                start_time_ms: start_ms,
                end_time_ms: end_ms,
                lines: text_lines,
            });
        }

        let overlap_count = cues.windows(2)
            .filter(|pair| pair[0].end_time_ms > pair[1].start_time_ms)
            .count();
        if overlap_count > 0 {
            warn!("Found {} overlapping subtitle cues", overlap_count);
        }
        debug!("Parsed {} subtitle cues", cues.len());

        Ok(SubtitleTrack { cues })
    }

    /// Build a track from cues, checking that it survives the wire format
    pub fn from_cues(cues: Vec<SubtitleCue>) -> Result<Self, ParseError> {
        let candidate = SubtitleTrack { cues };
        let reparsed = Self::parse(&candidate.serialize())?;
        if reparsed != candidate {
            // Only text normalization (trim, blank lines) can make them differ
            let index = candidate.cues.iter()
                .zip(reparsed.cues.iter())
                .find(|(a, b)| a != b)
                .map_or(candidate.cues.len(), |(a, _)| a.index);
            return Err(ParseError::UnrepresentableText { index });
        }
        Ok(candidate)
    }

    /// Build a track from cues already known to satisfy the track invariants
    pub(crate) fn from_cues_unchecked(cues: Vec<SubtitleCue>) -> Self {
        SubtitleTrack { cues }
    }

    /// Serialize to SRT text, the structural inverse of [`Self::parse`]
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for cue in &self.cues {
            out.push_str(&cue.to_string());
        }
        out
    }

    /// All cues in index order
    pub fn cues(&self) -> &[SubtitleCue] {
        &self.cues
    }

    /// Number of cues
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Whether the track has no cues
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Total cue text length in characters
    pub fn text_char_len(&self) -> usize {
        self.cues.iter().map(SubtitleCue::char_len).sum()
    }

    /// End time of the last cue
    pub fn duration_ms(&self) -> u64 {
        self.cues.iter().map(|c| c.end_time_ms).max().unwrap_or(0)
    }
}

fn parse_index_line(raw: &str, line: usize) -> Result<usize, ParseError> {
    let trimmed = raw.trim();
    match trimmed.parse::<usize>() {
        Ok(0) => Err(ParseError::InvalidIndex { line, value: trimmed.to_string() }),
        Ok(index) => Ok(index),
        Err(_) if trimmed.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+') => {
            Err(ParseError::InvalidIndex { line, value: trimmed.to_string() })
        }
        Err(_) => Err(ParseError::MissingIndex { line, found: trimmed.to_string() }),
    }
}

fn parse_timing_line(raw: &str, line: usize) -> Result<(u64, u64), ParseError> {
    let malformed = || ParseError::MalformedTimestamp { line, value: raw.trim().to_string() };

    let caps = TIMING_REGEX.captures(raw).ok_or_else(malformed)?;
    let start = format!("{}:{}:{},{}", &caps[1], &caps[2], &caps[3], &caps[4]);
    let end = format!("{}:{}:{},{}", &caps[5], &caps[6], &caps[7], &caps[8]);

    let start_ms = SubtitleCue::parse_timestamp(&start).ok_or_else(malformed)?;
    let end_ms = SubtitleCue::parse_timestamp(&end).ok_or_else(malformed)?;
    Ok((start_ms, end_ms))
}

impl fmt::Display for SubtitleTrack {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Track")?;
        writeln!(f, "Cues: {}", self.cues.len())?;
        writeln!(f, "Duration: {}", SubtitleCue::format_timestamp(self.duration_ms()))?;
        Ok(())
    }
}
