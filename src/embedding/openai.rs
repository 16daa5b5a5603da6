//! OpenAI provider: `/v1/embeddings` and `/v1/chat/completions`.

use crate::embedding::{zero_vector, ChatProvider, EmbeddingProvider};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-3-small";

const BASE_URL: &str = "https://api.openai.com/v1";

/// Dimensionality of the known OpenAI embedding models.
fn embed_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    embed_model: String,
    dims: usize,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, chat_model: &str, embed_model: &str) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Provider("openai: API key is required".into()));
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
            dims: embed_dimensions(embed_model),
        })
    }

    /// Point the provider at an OpenAI-compatible endpoint (tests, proxies).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(zero_vector(self.dims));
        }

        let resp: EmbeddingResponse = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.embed_model,
                input: [text],
            })
            .send()
            .await
            .map_err(|e| Error::Provider(format!("openai embed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Provider(format!("openai embed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Provider(format!("openai embed: {e}")))?;

        resp.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Provider("openai embed: no embedding returned".into()))
    }

    fn model_name(&self) -> &str {
        &self.embed_model
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let resp: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.chat_model,
                messages: [ChatMessage {
                    role: "user",
                    content: prompt,
                }],
            })
            .send()
            .await
            .map_err(|e| Error::Provider(format!("openai complete: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Provider(format!("openai complete: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Provider(format!("openai complete: {e}")))?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Provider("openai complete: no completion returned".into()))
    }

    fn chat_model_name(&self) -> &str {
        &self.chat_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_resolves_to_defaults() {
        let p = OpenAiProvider::new("key", "auto", "auto").unwrap();
        assert_eq!(p.chat_model_name(), DEFAULT_CHAT_MODEL);
        assert_eq!(p.model_name(), DEFAULT_EMBED_MODEL);
        assert_eq!(p.dimensions(), 1536);
    }

    #[test]
    fn large_model_has_wider_vectors() {
        let p = OpenAiProvider::new("key", "auto", "text-embedding-3-large").unwrap();
        assert_eq!(p.dimensions(), 3072);
    }

    #[test]
    fn missing_key_is_rejected() {
        assert!(OpenAiProvider::new("", "auto", "auto").is_err());
    }

    #[tokio::test]
    async fn empty_text_short_circuits_to_zero_vector() {
        let p = OpenAiProvider::new("key", "auto", "auto").unwrap();
        // No HTTP traffic happens for empty input, so the bogus key is fine.
        let v = p.embed("   ").await.unwrap();
        assert_eq!(v.len(), 1536);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn embedding_response_parses() {
        let json = r#"{"data":[{"embedding":[0.1,-0.2,0.3],"index":0}],"model":"text-embedding-3-small"}"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data[0].embedding, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn chat_response_parses() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices[0].message.content.as_deref(), Some("hello"));
    }
}
