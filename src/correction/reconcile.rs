/*!
 * Reconciliation of corrected text onto the original timing.
 *
 * Batches run strictly one after another in index order. A failed batch
 * keeps its original text and is flagged unresolved; the run only fails
 * when no batch could be corrected at all.
 */

use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::CorrectionConfig;
use crate::errors::CorrectionError;
use crate::subtitle_processor::{SubtitleCue, SubtitleTrack};
use super::adapter::CorrectionAdapter;
use super::batch::CorrectionBatch;
use super::report::{CorrectionOutcome, CorrectionReport, CorrectionReportEntry, EntryStatus, RunStatus};

/// Signal emitted after each batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Batches finished so far, this one included
    pub completed: usize,
    pub total: usize,
    pub batch_id: usize,
    /// False when the batch was flagged unresolved
    pub resolved: bool,
}

/// Progress callback
pub type ProgressCallback = Arc<dyn Fn(BatchProgress) + Send + Sync>;

/// Caller hooks for a run
#[derive(Clone, Default)]
pub struct RunHooks {
    /// Checked between batches, never mid-batch
    pub cancel: CancellationToken,
    pub progress: Option<ProgressCallback>,
}

impl RunHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: impl Fn(BatchProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    fn report(&self, progress: BatchProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

impl fmt::Debug for RunHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunHooks")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Apply corrections batch by batch onto a copy of `track`
pub async fn reconcile(
    track: &SubtitleTrack,
    batches: &[CorrectionBatch<'_>],
    adapter: &CorrectionAdapter<'_>,
    config: &CorrectionConfig,
    hooks: &RunHooks,
) -> Result<CorrectionOutcome, CorrectionError> {
    let total = batches.len();
    let mut cues: Vec<SubtitleCue> = Vec::with_capacity(track.len());
    let mut report = CorrectionReport::default();
    let mut unresolved = Vec::new();
    let mut status = RunStatus::Completed;
    let mut completed = 0;

    for (position, batch) in batches.iter().enumerate() {
        if position > 0 && config.batch_delay_ms > 0 {
            tokio::select! {
                _ = hooks.cancel.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_millis(config.batch_delay_ms)) => {}
            }
        }
        if hooks.cancel.is_cancelled() {
            info!("Cancellation requested after {} of {} batches", completed, total);
            status = RunStatus::Cancelled;
            break;
        }

        let resolved = match adapter.correct_batch(batch).await {
            Ok(corrected) => {
                for (cue, lines) in batch.cues.iter().zip(corrected) {
                    apply_correction(cue, lines, config.report_unchanged, &mut cues, &mut report);
                }
                true
            }
            Err(error) => {
                let (first, last) = batch.index_span();
                warn!("Keeping original text for cues {}-{}: {}", first, last, error);
                for cue in batch.cues {
                    report.push(CorrectionReportEntry {
                        cue_index: cue.index,
                        original_text: cue.text(),
                        corrected_text: cue.text(),
                        status: EntryStatus::Unresolved,
                    });
                    cues.push(cue.clone());
                }
                unresolved.push(error);
                false
            }
        };

        completed += 1;
        hooks.report(BatchProgress {
            completed,
            total,
            batch_id: batch.batch_id,
            resolved,
        });
    }

    if status == RunStatus::Completed && total > 0 && unresolved.len() == total {
        if let Some(last) = unresolved.pop() {
            return Err(CorrectionError::AllBatchesFailed { batches: total, last });
        }
    }

    // Cues of batches never started are carried through without report entries
    if cues.len() < track.len() {
        cues.extend_from_slice(&track.cues()[cues.len()..]);
    }

    Ok(CorrectionOutcome {
        corrected_track: SubtitleTrack::from_cues_unchecked(cues),
        report,
        unresolved_batches: unresolved,
        status,
        batches_total: total,
        batches_completed: completed,
    })
}

fn apply_correction(
    cue: &SubtitleCue,
    lines: Vec<String>,
    report_unchanged: bool,
    cues: &mut Vec<SubtitleCue>,
    report: &mut CorrectionReport,
) {
    let original = cue.text();
    let corrected = lines.join("\n");

    if original.trim() == corrected.trim() {
        if report_unchanged {
            report.push(CorrectionReportEntry {
                cue_index: cue.index,
                original_text: original.clone(),
                corrected_text: original,
                status: EntryStatus::Unchanged,
            });
        }
        cues.push(cue.clone());
        return;
    }

    debug!("Cue {}: {:?} -> {:?}", cue.index, original, corrected);
    report.push(CorrectionReportEntry {
        cue_index: cue.index,
        original_text: original,
        corrected_text: corrected,
        status: EntryStatus::Changed,
    });
    cues.push(cue.with_lines(lines));
}
