/*!
 * Subtitle correction engine.
 *
 * - `batch`: partitions a track into bounded batches with reference excerpts
 * - `adapter`: service seam, reply validation and retries
 * - `llm`: the service implementation backed by a language model
 * - `prompts`: prompt templates and reply parsing
 * - `reconcile`: applies corrections in order, with progress and cancellation
 * - `report`: change report and run outcome
 * - `engine`: the end-to-end pipeline
 */

pub mod adapter;
pub mod batch;
pub mod engine;
pub mod llm;
pub mod prompts;
pub mod reconcile;
pub mod report;

pub use adapter::{CorrectionAdapter, CorrectionRequest, CorrectionResponse, CorrectionService};
pub use batch::{CorrectionBatch, partition};
pub use engine::{CorrectionEngine, correct};
pub use llm::LlmCorrectionService;
pub use prompts::CueItem;
pub use reconcile::{BatchProgress, ProgressCallback, RunHooks, reconcile};
pub use report::{
    CorrectionOutcome, CorrectionReport, CorrectionReportEntry, EntryStatus, NO_CHANGES, RenderOptions, RunStatus,
    render, render_with,
};
