/*!
 * Provider implementations for the correction service.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API integration (also used for LM Studio)
 * - Anthropic: Anthropic API integration
 * - Mock: scripted provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::app_config::{ServiceConfig, ServiceProvider};
use crate::errors::ProviderError;

/// Provider-neutral text completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System prompt
    pub system: String,
    /// User prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

/// Provider-neutral text completion response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Prompt tokens, when reported
    pub prompt_tokens: Option<u64>,
    /// Completion tokens, when reported
    pub completion_tokens: Option<u64>,
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the correction service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<CompletionResponse, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

/// Build the provider selected in the service configuration
pub fn from_config(config: &ServiceConfig) -> Result<Box<dyn Provider>, ProviderError> {
    let model = config.get_model();
    let endpoint = config.get_endpoint();
    let timeout = config.get_timeout();

    let provider: Box<dyn Provider> = match config.provider {
        ServiceProvider::Ollama => Box::new(ollama::Ollama::new(&endpoint, model, timeout)?),
        ServiceProvider::OpenAI => Box::new(openai::OpenAI::new(config.get_api_key(), endpoint, model, timeout)),
        ServiceProvider::LMStudio => Box::new(openai::OpenAI::new(String::new(), endpoint, model, timeout)),
        ServiceProvider::Anthropic => Box::new(anthropic::Anthropic::new(config.get_api_key(), endpoint, model, timeout)),
    };
    Ok(provider)
}

pub mod ollama;
pub mod openai;
pub mod anthropic;
pub mod mock;
