/*!
 * Correction request/response adapter.
 *
 * Turns a batch into a service request tagged with cue indices, validates
 * the reply against the batch and retries with bounded exponential backoff.
 * A batch that still has no valid reply fails with a
 * [`CorrectionServiceError`]; nothing is guessed.
 */

use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashSet;

use crate::app_config::RetryPolicy;
use crate::errors::{AttemptError, CorrectionServiceError, ProviderError, ResponseError};
use crate::subtitle_processor::{SubtitleCue, normalize_lines};
use super::batch::CorrectionBatch;
use super::prompts::CueItem;

/// What the correction service is asked for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionRequest {
    /// Sequential id of the batch
    pub batch_id: usize,
    /// Reference text for the batch
    pub reference_excerpt: String,
    /// Cues to correct, in index order
    pub items: Vec<CueItem>,
    /// Read-only preceding cues
    pub context: Vec<CueItem>,
}

impl CorrectionRequest {
    /// Build the request for a batch
    pub fn from_batch(batch: &CorrectionBatch<'_>) -> Self {
        Self {
            batch_id: batch.batch_id,
            reference_excerpt: batch.reference_excerpt.to_string(),
            items: batch.cues.iter().map(cue_item).collect(),
            context: batch.context.iter().map(cue_item).collect(),
        }
    }
}

fn cue_item(cue: &SubtitleCue) -> CueItem {
    CueItem {
        index: cue.index,
        text: cue.text(),
    }
}

/// What the correction service answered, in any order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorrectionResponse {
    /// Corrected cues keyed by index
    pub items: Vec<CueItem>,
}

/// Anything that can correct a batch of cues against a reference excerpt
#[async_trait]
pub trait CorrectionService: Send + Sync {
    /// Ask for corrected texts of `request.items`
    async fn correct(&self, request: &CorrectionRequest) -> Result<CorrectionResponse, ProviderError>;

    /// Short name for logs
    fn name(&self) -> &str {
        "correction service"
    }
}

/// Validating, retrying front end of a [`CorrectionService`]
pub struct CorrectionAdapter<'s> {
    service: &'s dyn CorrectionService,
    retry: RetryPolicy,
    max_length_change_ratio: Option<f64>,
}

impl<'s> CorrectionAdapter<'s> {
    pub fn new(service: &'s dyn CorrectionService, retry: RetryPolicy, max_length_change_ratio: Option<f64>) -> Self {
        Self {
            service,
            retry,
            max_length_change_ratio,
        }
    }

    /// Corrected lines for every cue of `batch`, in batch order
    pub async fn correct_batch(&self, batch: &CorrectionBatch<'_>) -> Result<Vec<Vec<String>>, CorrectionServiceError> {
        let request = CorrectionRequest::from_batch(batch);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let result = match self.service.correct(&request).await {
                Ok(response) => validate_response(batch, response, self.max_length_change_ratio)
                    .map_err(AttemptError::from),
                Err(e) => Err(AttemptError::from(e)),
            };

            let cause = match result {
                Ok(corrected) => {
                    if attempts > 1 {
                        debug!("Batch {} succeeded on attempt {}", batch.batch_id, attempts);
                    }
                    return Ok(corrected);
                }
                Err(cause) => cause,
            };

            let retries_used = attempts - 1;
            if !cause.is_retryable() || retries_used >= self.retry.max_retries {
                return Err(CorrectionServiceError {
                    batch_id: batch.batch_id,
                    attempts,
                    cause,
                });
            }

            let delay = self.retry.delay_for(retries_used);
            warn!(
                "Batch {} attempt {}/{} via {} failed: {}. Retrying in {:?}",
                batch.batch_id, attempts, self.retry.max_retries + 1, self.service.name(), cause, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Check a reply against its batch and return normalised lines per cue
///
/// Items echoing a context cue are ignored. The reply may be in any order.
pub fn validate_response(
    batch: &CorrectionBatch<'_>,
    response: CorrectionResponse,
    max_length_change_ratio: Option<f64>,
) -> Result<Vec<Vec<String>>, ResponseError> {
    let context: HashSet<usize> = batch.context.iter().map(|c| c.index).collect();
    let wanted: HashSet<usize> = batch.cues.iter().map(|c| c.index).collect();

    let mut items: Vec<CueItem> = response.items
        .into_iter()
        .filter(|item| !context.contains(&item.index))
        .collect();
    items.sort_by_key(|item| item.index);

    for pair in items.windows(2) {
        if pair[0].index == pair[1].index {
            return Err(ResponseError::DuplicateCue { index: pair[0].index });
        }
    }
    if let Some(item) = items.iter().find(|item| !wanted.contains(&item.index)) {
        return Err(ResponseError::UnexpectedCue { index: item.index });
    }
    if items.len() != batch.len() {
        return Err(ResponseError::CountMismatch {
            expected: batch.len(),
            found: items.len(),
        });
    }

    batch.cues.iter()
        .zip(items)
        .map(|(cue, item)| {
            if cue.index != item.index {
                return Err(ResponseError::MissingCue { index: cue.index });
            }
            corrected_lines(cue, &item.text, max_length_change_ratio)
        })
        .collect()
}

fn corrected_lines(cue: &SubtitleCue, text: &str, max_ratio: Option<f64>) -> Result<Vec<String>, ResponseError> {
    let lines = normalize_lines(text);
    if lines.is_empty() {
        if cue.lines.is_empty() {
            return Ok(Vec::new());
        }
        return Err(ResponseError::EmptyText { index: cue.index });
    }
    if lines.iter().any(|line| SubtitleCue::is_timing_line(line)) {
        return Err(ResponseError::ForbiddenText { index: cue.index });
    }

    if let Some(ratio) = max_ratio {
        let original = cue.char_len();
        let corrected: usize = lines.iter().map(|l| l.chars().count()).sum();
        let drift = original.abs_diff(corrected) as f64 / original.max(1) as f64;
        if drift > ratio {
            return Err(ResponseError::LengthDrift {
                index: cue.index,
                original,
                corrected,
            });
        }
    }

    Ok(lines)
}
