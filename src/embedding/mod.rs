//! Embedding and completion gateway.
//!
//! Providers are constructed without any network call; failures surface as
//! [`Error::Provider`] carrying the cause. Empty or whitespace-only text is
//! short-circuited to a zero vector of the model's dimensionality so the
//! remote API is never asked to embed nothing.

pub mod gemini;
pub mod multi;
pub mod openai;

pub use multi::MultiEmbedder;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Text → vector over one named model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text into a vector of [`Self::dimensions`] f32s.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Name of the embedding model.
    fn model_name(&self) -> &str;

    /// Dimensionality of the vectors this provider produces.
    fn dimensions(&self) -> usize;
}

/// Single-shot text generation, used by the entity-extraction pass.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Name of the chat model.
    fn chat_model_name(&self) -> &str;
}

/// A backend exposing both capabilities.
pub trait Provider: EmbeddingProvider + ChatProvider {}

impl<T: EmbeddingProvider + ChatProvider> Provider for T {}

/// Build the provider for the configured backend. No network traffic.
pub fn create_provider(config: &LlmConfig, embed_model: &str) -> Result<Arc<dyn Provider>> {
    match config.backend.as_str() {
        "openai" => Ok(Arc::new(openai::OpenAiProvider::new(
            &config.openai_api_key,
            &config.chat_model,
            embed_model,
        )?)),
        "gemini" => Ok(Arc::new(gemini::GeminiProvider::new(
            &config.gemini_api_key,
            &config.chat_model,
            embed_model,
        )?)),
        other => Err(Error::Provider(format!(
            "unsupported backend: {other:?} (supported: openai, gemini)"
        ))),
    }
}

/// Zero vector used for the empty-text short circuit.
pub(crate) fn zero_vector(dims: usize) -> Vec<f32> {
    vec![0.0; dims]
}
