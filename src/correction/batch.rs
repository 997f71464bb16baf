/*!
 * Batch partitioning.
 *
 * Splits a subtitle track into contiguous, size-bounded batches that cover
 * every cue exactly once, in index order, and gives each batch the part of
 * the reference transcript estimated to correspond to it.
 */

use log::debug;
use std::ops::Range;

use crate::app_config::{CorrectionConfig, ExcerptStrategy};
use crate::errors::CorrectionError;
use crate::subtitle_processor::{SubtitleCue, SubtitleTrack};
use crate::transcript::ReferenceTranscript;

/// A contiguous group of cues corrected together in one service call
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionBatch<'a> {
    /// Sequential 1-based batch id
    pub batch_id: usize,
    /// Positions of the batch's cues in the track
    pub cue_range: Range<usize>,
    /// The cues to correct
    pub cues: &'a [SubtitleCue],
    /// Preceding cues sent read-only as context
    pub context: &'a [SubtitleCue],
    /// Reference text estimated to correspond to the cues
    pub reference_excerpt: &'a str,
}

impl CorrectionBatch<'_> {
    /// Number of cues to correct
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Batches are never empty
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Index of the first and last cue, for logs and reports
    pub fn index_span(&self) -> (usize, usize) {
        let first = self.cues.first().map_or(0, |c| c.index);
        let last = self.cues.last().map_or(0, |c| c.index);
        (first, last)
    }
}

/// Split `track` into batches of at most `config.max_batch_size` cues
pub fn partition<'a>(
    track: &'a SubtitleTrack,
    reference: &'a ReferenceTranscript,
    config: &CorrectionConfig,
) -> Result<Vec<CorrectionBatch<'a>>, CorrectionError> {
    config.validate().map_err(CorrectionError::InvalidConfig)?;
    if track.is_empty() {
        return Err(CorrectionError::EmptyTrack);
    }

    let cues = track.cues();
    let ranges = cue_ranges(cues, config.max_batch_size, config.max_batch_chars);

    // Empty cue text still counts, so every batch gets some share
    let weights: Vec<usize> = cues.iter().map(|c| c.char_len().max(1)).collect();
    let total_weight: usize = weights.iter().sum();
    let reference_len = reference.char_len();

    let mut batches = Vec::with_capacity(ranges.len());
    let mut cumulative = 0;
    for (i, range) in ranges.into_iter().enumerate() {
        let batch_weight: usize = weights[range.clone()].iter().sum();
        let share_before = cumulative;
        cumulative += batch_weight;

        let excerpt_range = match config.excerpt_strategy {
            ExcerptStrategy::Whole => 0..reference_len,
            ExcerptStrategy::Proportional => {
                let start = share_before * reference_len / total_weight;
                let end = (cumulative * reference_len).div_ceil(total_weight);
                let pad = ((end - start) as f64 * config.reference_slack).ceil() as usize;
                let padded = start.saturating_sub(pad)..(end + pad).min(reference_len);
                if config.snap_to_segments {
                    reference.snap_to_segments(padded)
                } else {
                    padded
                }
            }
        };

        let context_start = range.start.saturating_sub(config.context_cues);
        let batch = CorrectionBatch {
            batch_id: i + 1,
            cue_range: range.clone(),
            cues: &cues[range.clone()],
            context: &cues[context_start..range.start],
            reference_excerpt: reference.slice_chars(excerpt_range.clone()).trim(),
        };

        let (first, last) = batch.index_span();
        debug!(
            "Batch {}: cues {}-{} ({} cues, {} context), reference chars {}..{}",
            batch.batch_id, first, last, batch.len(), batch.context.len(),
            excerpt_range.start, excerpt_range.end
        );
        batches.push(batch);
    }

    Ok(batches)
}

/// Contiguous position ranges bounded by cue count and optionally characters
fn cue_ranges(cues: &[SubtitleCue], max_cues: usize, max_chars: Option<usize>) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut chars = 0;

    for (pos, cue) in cues.iter().enumerate() {
        let cue_chars = cue.char_len();
        let full = pos - start >= max_cues;
        let too_long = max_chars.is_some_and(|limit| chars + cue_chars > limit);
        if pos > start && (full || too_long) {
            ranges.push(start..pos);
            start = pos;
            chars = 0;
        }
        chars += cue_chars;
    }
    if start < cues.len() {
        ranges.push(start..cues.len());
    }
    ranges
}
