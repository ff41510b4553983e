//! Text generation provider abstraction.
//!
//! Handlers only see [`TextProvider`], so the hosted backend can be swapped
//! (Anthropic in production, mock in tests).

pub mod anthropic;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Response contained no content")]
    EmptyResponse,
}

/// Decoding parameters for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Maximum output tokens.
    pub max_tokens: u32,

    /// Sampling temperature (0.0 - 1.0).
    pub temperature: f32,
}

/// The first content segment of a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSegment {
    Text(String),

    /// A segment of another type (e.g. `tool_use`); carries the type name.
    NonText(String),
}

/// Result of a provider call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub segment: ContentSegment,

    /// Input tokens consumed.
    pub input_tokens: u32,

    /// Output tokens generated.
    pub output_tokens: u32,

    /// Why generation stopped, as reported by the provider.
    pub stop_reason: Option<String>,
}

/// Trait for hosted text generation.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate a response to a single user turn.
    async fn generate(
        &self,
        system_instruction: &str,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Whether the provider is usable. Does not call out to the network.
    async fn health_check(&self) -> Result<(), ProviderError>;

    /// Identifier of the backing model, for logs.
    fn model(&self) -> &str;
}
