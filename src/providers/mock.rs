/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different model behaviors:
 * - `MockProvider::echo()` - Replies with the cues it was asked to correct, unchanged
 * - `MockProvider::fenced()` - Same reply wrapped in a Markdown code fence with prose
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::garbage()` - Replies with text that is not a cue list
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::correction::prompts::{CueItem, CuePayload, extract_cue_payload};
use crate::errors::ProviderError;
use super::{CompletionRequest, CompletionResponse, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Reply with the requested cues as JSON
    Echo,
    /// Reply with JSON inside a code fence, surrounded by prose
    Fenced,
    /// Reply with one `N: text` line per cue
    LineFormat,
    /// Reply with the last cue missing
    DropLast,
    /// Reply with text that is not a cue list
    Garbage,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with a connection error
    Failing,
}

/// Mock provider for testing correction behavior
///
/// Clones share the request log and counter.
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Text rewrite applied to each cue before replying
    rewrite: Option<fn(&str) -> String>,
    /// Requests received, most recent last
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            rewrite: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that echoes its input
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Create a mock that wraps its reply in a code fence
    pub fn fenced() -> Self {
        Self::new(MockBehavior::Fenced)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that replies with unusable text
    pub fn garbage() -> Self {
        Self::new(MockBehavior::Garbage)
    }

    /// Create a mock that replies with `N: text` lines
    pub fn line_format() -> Self {
        Self::new(MockBehavior::LineFormat)
    }

    /// Apply a rewrite to every cue text in the reply
    pub fn with_rewrite(mut self, rewrite: fn(&str) -> String) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copies of all requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    fn reply_cues(&self, payload: &CuePayload) -> Vec<CueItem> {
        payload.cues.iter()
            .map(|cue| CueItem {
                index: cue.index,
                text: self.rewrite.map_or_else(|| cue.text.clone(), |f| f(&cue.text)),
            })
            .collect()
    }

    fn as_json(cues: Vec<CueItem>) -> String {
        serde_json::to_string(&CuePayload { cues }).unwrap_or_default()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request.clone());

        let payload = extract_cue_payload(&request.prompt).unwrap_or_default();

        let text = match self.behavior {
            MockBehavior::Echo => Self::as_json(self.reply_cues(&payload)),
            MockBehavior::Fenced => format!(
                "Here are the corrected subtitles:\n```json\n{}\n```\nLet me know if you need anything else.",
                Self::as_json(self.reply_cues(&payload))
            ),
            MockBehavior::LineFormat => self.reply_cues(&payload)
                .iter()
                .map(|c| format!("{}: {}", c.index, c.text.replace('\n', " ")))
                .collect::<Vec<_>>()
                .join("\n"),
            MockBehavior::DropLast => {
                let mut cues = self.reply_cues(&payload);
                cues.pop();
                Self::as_json(cues)
            }
            MockBehavior::Garbage => "I am sorry, I cannot help with that.".to_string(),
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == 0 {
                    return Err(ProviderError::ConnectionError(format!("Simulated failure on request {}", count)));
                }
                Self::as_json(self.reply_cues(&payload))
            }
            MockBehavior::Failing => {
                return Err(ProviderError::ConnectionError("Simulated provider failure".to_string()));
            }
        };

        Ok(CompletionResponse {
            prompt_tokens: Some((request.prompt.len() / 4) as u64),
            completion_tokens: Some((text.len() / 4) as u64),
            text,
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated provider failure".to_string())),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
