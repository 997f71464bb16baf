/*!
 * Error types for the subalign library.
 *
 * This module contains custom error types for the different layers of the
 * correction run, using the thiserror crate for ergonomic error definitions.
 * Parse and configuration errors are fatal to a run, provider and response
 * errors are contained at batch granularity.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),
}

impl ProviderError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AuthenticationError(_) => false,
            Self::ApiError { status_code, .. } => {
                *status_code == 408 || *status_code == 429 || *status_code >= 500
            }
            _ => true,
        }
    }

    /// Classify a failed HTTP status into a provider error
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }

    /// Classify a transport error from reqwest
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised while parsing subtitle or reference input.
///
/// Line numbers are 1-based and refer to the raw input text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A block does not start with a cue index line
    #[error("line {line}: expected a cue index, found {found:?}")]
    MissingIndex { line: usize, found: String },

    /// The cue index line is not a positive integer
    #[error("line {line}: invalid cue index {value:?}")]
    InvalidIndex { line: usize, value: String },

    /// Cue numbering is not 1-based, contiguous and increasing
    #[error("line {line}: cue index {found} out of sequence, expected {expected}")]
    NonSequentialIndex { line: usize, expected: usize, found: usize },

    /// The block ends before its time-range line
    #[error("line {line}: cue {index} is missing its time range")]
    MissingTiming { line: usize, index: usize },

    /// The time-range line is not `HH:MM:SS,mmm --> HH:MM:SS,mmm`
    #[error("line {line}: malformed time range {value:?}")]
    MalformedTimestamp { line: usize, value: String },

    /// The end time is not after the start time
    #[error("line {line}: cue {index} ends at {end_ms}ms, not after its start at {start_ms}ms")]
    InvalidTimeRange { line: usize, index: usize, start_ms: u64, end_ms: u64 },

    /// The cue starts before the previous cue
    #[error("line {line}: cue {index} starts at {start_ms}ms, before the previous cue at {previous_ms}ms")]
    StartTimeRegression { line: usize, index: usize, start_ms: u64, previous_ms: u64 },

    /// The block has no text lines
    #[error("line {line}: cue {index} has no text")]
    MissingText { line: usize, index: usize },

    /// A text line is itself a time range, which means a blank separator is missing
    #[error("line {line}: cue {index} contains a time-range line in its text (missing blank line?)")]
    AmbiguousTextLine { line: usize, index: usize },

    /// A cue built in memory whose text would change when written and read back
    #[error("cue {index} text does not survive the subtitle format (untrimmed or blank lines)")]
    UnrepresentableText { index: usize },

    /// The reference transcript contains no usable text
    #[error("reference transcript is empty after normalization")]
    EmptyReference,
}

/// Structural problems found when validating a correction reply
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResponseError {
    /// The reply has a different number of items than the batch
    #[error("expected {expected} corrected cues, received {found}")]
    CountMismatch { expected: usize, found: usize },

    /// A cue of the batch is absent from the reply
    #[error("cue {index} missing from reply")]
    MissingCue { index: usize },

    /// The reply names a cue outside the batch
    #[error("reply contains cue {index}, which is not part of the batch")]
    UnexpectedCue { index: usize },

    /// The reply names a cue more than once
    #[error("reply contains cue {index} more than once")]
    DuplicateCue { index: usize },

    /// The reply blanked out a cue that had text
    #[error("reply for cue {index} is empty")]
    EmptyText { index: usize },

    /// A corrected text line would be read back as a time range
    #[error("reply for cue {index} contains a time-range line")]
    ForbiddenText { index: usize },

    /// The corrected text length moved too far from the original
    #[error("reply for cue {index} changes length from {original} to {corrected} characters")]
    LengthDrift { index: usize, original: usize, corrected: usize },
}

/// Failure of a single correction attempt
#[derive(Error, Debug)]
pub enum AttemptError {
    /// The provider call itself failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The provider answered, but the reply was unusable
    #[error("invalid reply: {0}")]
    InvalidResponse(#[from] ResponseError),
}

impl AttemptError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_retryable(),
            Self::InvalidResponse(_) => true,
        }
    }
}

/// A batch whose correction could not be obtained
#[derive(Error, Debug)]
#[error("batch {batch_id} failed after {attempts} attempt(s): {cause}")]
pub struct CorrectionServiceError {
    /// Sequential id of the failed batch
    pub batch_id: usize,
    /// Number of attempts made
    pub attempts: u32,
    /// Error of the last attempt
    #[source]
    pub cause: AttemptError,
}

/// Run-level errors of the correction engine
#[derive(Error, Debug)]
pub enum CorrectionError {
    /// Malformed subtitle or reference input
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The subtitle track has no cues to correct
    #[error("subtitle track contains no cues")]
    EmptyTrack,

    /// The run configuration cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Every batch failed, so nothing could be verified
    #[error("all {batches} batch(es) failed; last error: {last}")]
    AllBatchesFailed {
        /// Number of batches attempted
        batches: usize,
        /// Error of the last failed batch
        #[source]
        last: CorrectionServiceError,
    },

    /// Cooperative cancellation observed between batches
    #[error("correction cancelled after {completed_batches} of {total_batches} batch(es)")]
    Cancelled {
        completed_batches: usize,
        total_batches: usize,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from input parsing
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error from the correction run
    #[error("Correction error: {0}")]
    Correction(#[from] CorrectionError),

    /// Error in the configuration file
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
