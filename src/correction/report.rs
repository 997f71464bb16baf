/*!
 * Change report and run outcome.
 */

use serde::Serialize;
use std::fmt;

use crate::errors::{CorrectionError, CorrectionServiceError};
use crate::subtitle_processor::SubtitleTrack;

/// Line rendered when no entry survives filtering
pub const NO_CHANGES: &str = "No changes were made.";

/// What happened to one cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Text replaced by the correction
    Changed,
    /// Verified identical to the correction
    Unchanged,
    /// Batch failed, original text kept unverified
    Unresolved,
}

/// Report line for one cue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionReportEntry {
    pub cue_index: usize,
    pub original_text: String,
    /// Same as `original_text` unless the cue changed
    pub corrected_text: String,
    pub status: EntryStatus,
}

impl CorrectionReportEntry {
    pub fn changed(&self) -> bool {
        self.status == EntryStatus::Changed
    }

    pub fn is_unresolved(&self) -> bool {
        self.status == EntryStatus::Unresolved
    }
}

/// Append-only list of report entries in cue order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorrectionReport {
    entries: Vec<CorrectionReportEntry>,
}

impl CorrectionReport {
    pub fn push(&mut self, entry: CorrectionReportEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[CorrectionReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Pretty JSON for downstream tools
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}

/// Rendering switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Also list unchanged entries
    pub include_unchanged: bool,
}

/// Human-readable report with changed and unresolved entries only
pub fn render(report: &CorrectionReport) -> String {
    render_with(report, RenderOptions::default())
}

/// Human-readable report, one line per entry
pub fn render_with(report: &CorrectionReport, options: RenderOptions) -> String {
    let lines: Vec<String> = report.entries()
        .iter()
        .filter(|e| options.include_unchanged || e.status != EntryStatus::Unchanged)
        .map(render_entry)
        .collect();

    if lines.is_empty() {
        NO_CHANGES.to_string()
    } else {
        lines.join("\n")
    }
}

fn render_entry(entry: &CorrectionReportEntry) -> String {
    let original = one_line(&entry.original_text);
    match entry.status {
        EntryStatus::Changed => format!(
            "{}: {:?} -> {:?}",
            entry.cue_index, original, one_line(&entry.corrected_text)
        ),
        EntryStatus::Unresolved => format!("{}: {:?} -> kept due to failure", entry.cue_index, original),
        EntryStatus::Unchanged => format!("{}: {:?} (unchanged)", entry.cue_index, original),
    }
}

fn one_line(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join(" / ")
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every batch was attempted
    Completed,
    /// Stopped between batches on request
    Cancelled,
}

/// Result of a correction run
#[derive(Debug)]
pub struct CorrectionOutcome {
    /// Same cues and timing as the input, corrected where possible
    pub corrected_track: SubtitleTrack,
    pub report: CorrectionReport,
    /// Failures of the batches flagged unresolved
    pub unresolved_batches: Vec<CorrectionServiceError>,
    pub status: RunStatus,
    pub batches_total: usize,
    pub batches_completed: usize,
}

impl CorrectionOutcome {
    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }

    /// The cancellation as an error value, for callers that propagate it
    pub fn cancellation(&self) -> Option<CorrectionError> {
        self.is_cancelled().then(|| CorrectionError::Cancelled {
            completed_batches: self.batches_completed,
            total_batches: self.batches_total,
        })
    }

    pub fn changed_count(&self) -> usize {
        self.report.count(EntryStatus::Changed)
    }

    pub fn unresolved_count(&self) -> usize {
        self.report.count(EntryStatus::Unresolved)
    }
}

impl fmt::Display for CorrectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} of {} batches, {} cues changed, {} unresolved",
            self.batches_completed,
            self.batches_total,
            self.changed_count(),
            self.unresolved_count()
        )?;
        if self.is_cancelled() {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}
