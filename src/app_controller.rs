use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::correction::{
    CorrectionEngine, CorrectionOutcome, CorrectionService, LlmCorrectionService, RenderOptions, RunHooks, render_with,
};
use crate::file_utils::FileManager;
use crate::subtitle_processor::SubtitleTrack;

// @module: Application controller for subtitle correction

// @struct: One correction job and where its results go
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionJob {
    // @field: Reference transcript file
    pub transcript: PathBuf,

    // @field: ASR subtitle file
    pub subtitles: PathBuf,

    // @field: Corrected subtitle file, defaults next to the input
    pub output: Option<PathBuf>,

    // @field: Rendered report file, defaults next to the input
    pub report: Option<PathBuf>,

    // @field: Optional JSON report file
    pub json_report: Option<PathBuf>,

    // @field: Overwrite existing outputs
    pub force: bool,
}

impl CorrectionJob {
    pub fn new(transcript: impl Into<PathBuf>, subtitles: impl Into<PathBuf>) -> Self {
        Self {
            transcript: transcript.into(),
            subtitles: subtitles.into(),
            output: None,
            report: None,
            json_report: None,
            force: false,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output.clone()
            .unwrap_or_else(|| FileManager::corrected_subtitle_path(&self.subtitles))
    }

    pub fn report_path(&self) -> PathBuf {
        self.report.clone()
            .unwrap_or_else(|| FileManager::report_path(&self.subtitles))
    }
}

/// Main application controller for subtitle correction
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.correction.validate()
            .map_err(|e| anyhow!("Invalid correction settings: {}", e))?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a job against the configured provider; Ctrl-C cancels between batches
    pub async fn run(&self, job: &CorrectionJob) -> Result<CorrectionOutcome> {
        let service = LlmCorrectionService::from_config(&self.config.service)
            .context("Failed to create correction service")?;
        info!(
            "Using {} - {}",
            self.config.service.provider.display_name(),
            self.config.service.get_model()
        );
        Self::check_connection(&service).await;

        let cancel = CancellationToken::new();
        let signal_token = cancel.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current batch");
                signal_token.cancel();
            }
        });

        let result = self.run_with_service(Arc::new(service), job, cancel).await;
        signal_task.abort();
        result
    }

    /// Run a job with an explicit service and cancellation token
    ///
    /// Outputs are written only when every batch was attempted.
    pub async fn run_with_service(
        &self,
        service: Arc<dyn CorrectionService>,
        job: &CorrectionJob,
        cancel: CancellationToken,
    ) -> Result<CorrectionOutcome> {
        let start_time = Instant::now();
        let output_path = job.output_path();
        let report_path = job.report_path();

        FileManager::check_writable(&output_path, job.force)?;
        FileManager::check_writable(&report_path, job.force)?;
        if let Some(json_path) = &job.json_report {
            FileManager::check_writable(json_path, job.force)?;
        }

        let transcript = FileManager::load_transcript(&job.transcript)?;
        let track = FileManager::load_track(&job.subtitles)?;
        info!("Loaded {} cues and {} reference characters", track.len(), transcript.char_len());

        let progress_bar = Self::create_progress_bar();
        let bar = progress_bar.clone();
        let hooks = RunHooks::new()
            .with_cancel(cancel)
            .with_progress(move |progress| {
                bar.set_length(progress.total as u64);
                bar.set_position(progress.completed as u64);
                if !progress.resolved {
                    bar.set_message(format!("batch {} unresolved", progress.batch_id));
                }
            });

        let engine = CorrectionEngine::new(service, self.config.correction.clone())?;
        let outcome = engine.correct(&track, &transcript, &hooks).await;
        progress_bar.finish_and_clear();
        let outcome = outcome?;

        if outcome.is_cancelled() {
            warn!("Correction cancelled ({}), no files written", outcome);
            return Ok(outcome);
        }

        let options = RenderOptions {
            include_unchanged: self.config.correction.report_unchanged,
        };
        FileManager::save_track(&outcome.corrected_track, &output_path)?;
        FileManager::save_report(&render_with(&outcome.report, options), &report_path)?;
        if let Some(json_path) = &job.json_report {
            FileManager::save_json_report(&outcome.report, json_path)?;
        }
        debug!("Wrote {:?} and {:?}", output_path, report_path);

        if !outcome.unresolved_batches.is_empty() {
            warn!(
                "{} batch(es) could not be verified; their cues keep the original text",
                outcome.unresolved_batches.len()
            );
        }
        info!(
            "Correction completed in {}: {}",
            Self::format_duration(start_time.elapsed()),
            outcome
        );
        Ok(outcome)
    }

    /// Probe the provider before a run; failure only warns, batches retry on their own
    pub async fn check_connection(service: &LlmCorrectionService) -> bool {
        match service.test_connection().await {
            Ok(()) => {
                debug!("Connection to {} verified", service.name());
                true
            }
            Err(e) => {
                warn!("Connection test to {} failed: {}", service.name(), e);
                false
            }
        }
    }

    /// Parse a subtitle file without correcting it
    pub fn validate_subtitles(path: &Path) -> Result<SubtitleTrack> {
        FileManager::load_track(path)
    }

    fn create_progress_bar() -> ProgressBar {
        let progress_bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} batches ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("#>-"));
        progress_bar
    }

    /// Format duration in a human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:01}s", seconds, duration.subsec_millis() / 100)
        }
    }
}
