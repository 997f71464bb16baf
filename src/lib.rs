/*!
 * # subalign - subtitle correction against a reference transcript
 *
 * A Rust library that corrects the wording of automatically transcribed
 * subtitles using a trusted reference transcript, without touching cue
 * count or timing.
 *
 * ## Features
 *
 * - Strict SRT parsing with line-accurate errors and lossless serialization
 * - Contiguous, size-bounded batching with proportional reference excerpts
 * - Correction through various AI providers:
 *   - Ollama (local LLM)
 *   - OpenAI API (and OpenAI-compatible servers such as LM Studio)
 *   - Anthropic API
 * - Reply validation with bounded exponential retry
 * - Fail-soft reconciliation with a per-cue change report
 * - Progress reporting and cooperative cancellation between batches
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Subtitle track model and SRT wire format
 * - `transcript`: Reference transcript normalization and segmentation
 * - `correction`: The correction engine:
 *   - `correction::batch`: Batch partitioning
 *   - `correction::adapter`: Service seam, validation and retries
 *   - `correction::llm`: Service backed by a language model
 *   - `correction::reconcile`: In-order reconciliation
 *   - `correction::report`: Change report rendering
 *   - `correction::engine`: End-to-end pipeline
 * - `providers`: Client implementations for various LLM providers
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod subtitle_processor;
pub mod transcript;
pub mod correction;
pub mod app_controller;
pub mod providers;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::{Config, CorrectionConfig};
pub use subtitle_processor::{SubtitleCue, SubtitleTrack};
pub use transcript::ReferenceTranscript;
pub use correction::{
    CorrectionEngine, CorrectionOutcome, CorrectionReport, CorrectionService, LlmCorrectionService, RunHooks,
    correct, render,
};
pub use errors::{AppError, CorrectionError, CorrectionServiceError, ParseError, ProviderError, ResponseError};
