//! Multi-model fan-out over the embedding gateway.
//!
//! Built from a comma-separated model list; the first entry is the primary
//! and is used whenever no explicit model is named. The fan-out itself
//! implements [`EmbeddingProvider`] by delegating to the primary, so every
//! seam that takes a single-model embedder accepts a [`MultiEmbedder`] too.

use crate::config::LlmConfig;
use crate::embedding::{gemini, openai, EmbeddingProvider};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

pub struct MultiEmbedder {
    /// (model name, provider) in configuration order; index 0 is primary.
    providers: Vec<(String, Arc<dyn EmbeddingProvider>)>,
}

impl MultiEmbedder {
    /// Build one provider per model in `config.embed_models`. An empty or
    /// `"auto"` list resolves to the backend's single default model.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let list = match config.embed_models.trim() {
            "" | "auto" => match config.backend.as_str() {
                "openai" => openai::DEFAULT_EMBED_MODEL.to_string(),
                "gemini" => gemini::DEFAULT_EMBED_MODEL.to_string(),
                other => {
                    return Err(Error::Provider(format!("unsupported backend: {other:?}")))
                }
            },
            other => other.to_string(),
        };

        let mut providers: Vec<(String, Arc<dyn EmbeddingProvider>)> = Vec::new();
        for model in list.split(',') {
            let model = model.trim();
            if model.is_empty() {
                continue;
            }
            if providers.iter().any(|(name, _)| name == model) {
                continue;
            }
            let provider: Arc<dyn EmbeddingProvider> = match config.backend.as_str() {
                "openai" => Arc::new(openai::OpenAiProvider::new(
                    &config.openai_api_key,
                    "",
                    model,
                )?),
                "gemini" => Arc::new(gemini::GeminiProvider::new(
                    &config.gemini_api_key,
                    "",
                    model,
                )?),
                other => {
                    return Err(Error::Provider(format!("unsupported backend: {other:?}")))
                }
            };
            providers.push((model.to_string(), provider));
        }

        if providers.is_empty() {
            return Err(Error::Provider("no valid embedding models specified".into()));
        }

        Ok(Self { providers })
    }

    /// Wrap pre-built providers (tests). First entry is primary.
    pub fn from_providers(providers: Vec<(String, Arc<dyn EmbeddingProvider>)>) -> Result<Self> {
        if providers.is_empty() {
            return Err(Error::Provider("no valid embedding models specified".into()));
        }
        Ok(Self { providers })
    }

    /// Model names in configuration order, primary first.
    pub fn models(&self) -> Vec<&str> {
        self.providers.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn primary(&self) -> &str {
        &self.providers[0].0
    }

    /// True when more than one model is configured.
    pub fn is_multi(&self) -> bool {
        self.providers.len() > 1
    }

    pub fn dimensions_for(&self, model: &str) -> Result<usize> {
        self.provider_for(model).map(|p| p.dimensions())
    }

    fn provider_for(&self, model: &str) -> Result<&Arc<dyn EmbeddingProvider>> {
        self.providers
            .iter()
            .find(|(name, _)| name == model)
            .map(|(_, p)| p)
            .ok_or_else(|| Error::Provider(format!("unknown embedding model: {model}")))
    }

    /// Embed with a specific model.
    pub async fn embed_with_model(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        self.provider_for(model)?.embed(text).await
    }

    /// Embed with every configured model, in configuration order.
    /// Fails as a whole if any individual call fails.
    pub async fn embed_all(&self, text: &str) -> Result<Vec<(String, Vec<f32>)>> {
        let mut results = Vec::with_capacity(self.providers.len());
        for (model, provider) in &self.providers {
            let vector = provider
                .embed(text)
                .await
                .map_err(|e| Error::Embed(format!("embed with {model}: {e}")))?;
            results.push((model.clone(), vector));
        }
        Ok(results)
    }
}

#[async_trait]
impl EmbeddingProvider for MultiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.providers[0].1.embed(text).await
    }

    fn model_name(&self) -> &str {
        self.primary()
    }

    fn dimensions(&self) -> usize {
        self.providers[0].1.dimensions()
    }
}
