/*!
 * Correction pipeline.
 *
 * `correct` takes already-loaded values and returns a value; it performs
 * no file I/O. Persisting the outcome is up to the caller.
 */

use log::info;
use std::sync::Arc;

use crate::app_config::CorrectionConfig;
use crate::errors::CorrectionError;
use crate::subtitle_processor::SubtitleTrack;
use crate::transcript::ReferenceTranscript;
use super::adapter::{CorrectionAdapter, CorrectionService};
use super::batch::partition;
use super::reconcile::{RunHooks, reconcile};
use super::report::CorrectionOutcome;

/// Correct `track` against `reference`
pub async fn correct(
    track: &SubtitleTrack,
    reference: &ReferenceTranscript,
    config: &CorrectionConfig,
    service: &dyn CorrectionService,
    hooks: &RunHooks,
) -> Result<CorrectionOutcome, CorrectionError> {
    let batches = partition(track, reference, config)?;
    info!(
        "Correcting {} cues in {} batches via {} ({} reference chars)",
        track.len(),
        batches.len(),
        service.name(),
        reference.char_len()
    );

    let adapter = CorrectionAdapter::new(service, config.retry.clone(), config.max_length_change_ratio);
    let outcome = reconcile(track, &batches, &adapter, config, hooks).await?;

    info!("Correction finished: {}", outcome);
    Ok(outcome)
}

/// A correction service bound to a run configuration
#[derive(Clone)]
pub struct CorrectionEngine {
    service: Arc<dyn CorrectionService>,
    config: CorrectionConfig,
}

impl CorrectionEngine {
    /// Create an engine; fails on a configuration the engine cannot use
    pub fn new(service: Arc<dyn CorrectionService>, config: CorrectionConfig) -> Result<Self, CorrectionError> {
        config.validate().map_err(CorrectionError::InvalidConfig)?;
        Ok(Self { service, config })
    }

    pub fn config(&self) -> &CorrectionConfig {
        &self.config
    }

    /// Run one correction
    pub async fn correct(
        &self,
        track: &SubtitleTrack,
        reference: &ReferenceTranscript,
        hooks: &RunHooks,
    ) -> Result<CorrectionOutcome, CorrectionError> {
        correct(track, reference, &self.config, self.service.as_ref(), hooks).await
    }
}
