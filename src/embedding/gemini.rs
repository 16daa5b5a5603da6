//! Gemini provider: `models/{model}:embedContent` and `:generateContent`.

use crate::embedding::{zero_vector, ChatProvider, EmbeddingProvider};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-004";

/// text-embedding-004 dimensionality.
const EMBED_DIMENSIONS: usize = 768;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    embed_model: String,
}

impl GeminiProvider {
    pub fn new(api_key: &str, chat_model: &str, embed_model: &str) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Provider("gemini: API key is required".into()));
        }

        let chat_model = match chat_model {
            "" | "auto" => DEFAULT_CHAT_MODEL,
            other => other,
        };
        let embed_model = match embed_model {
            "" | "auto" => DEFAULT_EMBED_MODEL,
            other => other,
        };

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
            chat_model: chat_model.to_string(),
            embed_model: embed_model.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn model_url(&self, model: &str, action: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, action)
    }
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    content: Content<'a>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbedValues,
}

#[derive(Deserialize)]
struct EmbedValues {
    values: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl EmbeddingProvider for GeminiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(zero_vector(EMBED_DIMENSIONS));
        }

        let resp: EmbedResponse = self
            .client
            .post(self.model_url(&self.embed_model, "embedContent"))
            .query(&[("key", self.api_key.as_str())])
            .json(&EmbedRequest {
                content: Content {
                    parts: vec![Part { text }],
                },
            })
            .send()
            .await
            .map_err(|e| Error::Provider(format!("gemini embed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Provider(format!("gemini embed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Provider(format!("gemini embed: {e}")))?;

        if resp.embedding.values.is_empty() {
            return Err(Error::Provider("gemini embed: no embedding returned".into()));
        }
        Ok(resp.embedding.values)
    }

    fn model_name(&self) -> &str {
        &self.embed_model
    }

    fn dimensions(&self) -> usize {
        EMBED_DIMENSIONS
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let resp: GenerateResponse = self
            .client
            .post(self.model_url(&self.chat_model, "generateContent"))
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            })
            .send()
            .await
            .map_err(|e| Error::Provider(format!("gemini complete: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Provider(format!("gemini complete: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Provider(format!("gemini complete: {e}")))?;

        let text: String = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Provider("gemini complete: no text in response".into()));
        }
        Ok(text)
    }

    fn chat_model_name(&self) -> &str {
        &self.chat_model
    }
}
