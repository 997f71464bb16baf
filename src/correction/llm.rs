/*!
 * Correction service backed by an LLM provider.
 */

use async_trait::async_trait;
use log::debug;

use crate::app_config::{ServiceCommonConfig, ServiceConfig};
use crate::errors::ProviderError;
use crate::providers::{self, CompletionRequest, Provider};
use super::adapter::{CorrectionRequest, CorrectionResponse, CorrectionService};
use super::prompts::{PromptTemplate, build_user_prompt, parse_reply};

/// Maximum reply characters quoted in parse errors
const REPLY_PREVIEW_CHARS: usize = 200;

/// [`CorrectionService`] that prompts a language model
#[derive(Debug)]
pub struct LlmCorrectionService {
    provider: Box<dyn Provider>,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmCorrectionService {
    /// Wrap a provider using the common service settings
    pub fn new(provider: Box<dyn Provider>, common: &ServiceCommonConfig) -> Self {
        let template = PromptTemplate::new(&common.system_prompt);
        Self {
            provider,
            system_prompt: template.render(&common.language),
            temperature: common.temperature,
            max_tokens: common.max_tokens,
        }
    }

    /// Build the provider selected in `config` and wrap it
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ProviderError> {
        let provider = providers::from_config(config)?;
        Ok(Self::new(provider, &config.common))
    }

    /// Rendered system prompt
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Check that the provider is reachable
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }
}

#[async_trait]
impl CorrectionService for LlmCorrectionService {
    async fn correct(&self, request: &CorrectionRequest) -> Result<CorrectionResponse, ProviderError> {
        let prompt = build_user_prompt(&request.reference_excerpt, &request.context, &request.items);
        let completion = self.provider
            .complete(CompletionRequest {
                system: self.system_prompt.clone(),
                prompt,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            })
            .await?;

        debug!(
            "Batch {}: {} replied with {} chars (tokens in/out: {:?}/{:?})",
            request.batch_id,
            self.provider.name(),
            completion.text.len(),
            completion.prompt_tokens,
            completion.completion_tokens
        );

        match parse_reply(&completion.text) {
            Some(items) => Ok(CorrectionResponse { items }),
            None => {
                let preview: String = completion.text.chars().take(REPLY_PREVIEW_CHARS).collect();
                Err(ProviderError::ParseError(format!("no cue list found in reply: {:?}", preview)))
            }
        }
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}
