//! LLM entity extraction for memories.
//!
//! Asks the chat model for entities and relations as JSON and parses the
//! reply tolerantly: markdown fences are stripped, unknown entity types are
//! mapped onto the closed set, and an entities-only object is accepted when
//! the full shape fails to parse.

use crate::embedding::ChatProvider;
use crate::error::{Error, Result};
use crate::memory::types::EntityType;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub raw_type: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Role the entity plays in the source text.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl ExtractedEntity {
    pub fn entity_type(&self) -> EntityType {
        normalize_entity_type(&self.raw_type)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedRelation {
    pub source_name: String,
    pub target_name: String,
    pub relation_type: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub relations: Vec<ExtractedRelation>,
}

pub struct Extractor<'a> {
    chat: &'a dyn ChatProvider,
}

impl<'a> Extractor<'a> {
    pub fn new(chat: &'a dyn ChatProvider) -> Self {
        Self { chat }
    }

    pub async fn extract(&self, text: &str) -> Result<ExtractionResult> {
        let prompt = extraction_prompt(text);
        let response = self.chat.complete(&prompt).await?;
        parse_extraction_response(&response)
    }
}

fn extraction_prompt(text: &str) -> String {
    format!(
        r#"Extract entities and relationships from the following text. Return a JSON object with:
- "entities": array of objects with "name", "type", "description" (optional), "role" (optional)
- "relations": array of objects with "source_name", "target_name", "relation_type"

Entity types: person, organization, location, concept, technology, project, event, other

Guidelines:
- Extract named entities (people, companies, places, technologies, projects)
- Include concepts if they are significant topics
- Identify relationships between entities when clear
- Use lowercase for relation_type (e.g., "works_at", "uses", "part_of", "created_by")
- Keep descriptions brief (under 50 words)

Text:
"""
{text}
"""

Respond with ONLY valid JSON, no markdown or explanation:"#
    )
}

fn parse_extraction_response(response: &str) -> Result<ExtractionResult> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if cleaned.is_empty() || cleaned == "null" || cleaned == "{}" {
        return Ok(ExtractionResult::default());
    }

    match serde_json::from_str::<ExtractionResult>(cleaned) {
        Ok(mut result) => {
            for e in &mut result.entities {
                if e.confidence.is_none() {
                    e.confidence = Some(1.0);
                }
            }
            Ok(result)
        }
        Err(e) => Err(Error::Provider(format!(
            "unparseable extraction response: {e} (response: {})",
            truncate(cleaned, 200)
        ))),
    }
}

/// Map free-form model output onto the closed entity type set.
fn normalize_entity_type(raw: &str) -> EntityType {
    if let Ok(t) = raw.parse::<EntityType>() {
        return t;
    }
    match raw.to_lowercase().as_str() {
        "people" | "user" | "name" => EntityType::Person,
        "org" | "company" | "team" | "group" => EntityType::Organization,
        "place" | "address" | "city" | "country" => EntityType::Location,
        "idea" | "topic" | "theme" => EntityType::Concept,
        "tech" | "tool" | "framework" | "language" | "library" => EntityType::Technology,
        "repo" | "repository" | "product" => EntityType::Project,
        "meeting" | "deadline" | "milestone" | "date" => EntityType::Event,
        _ => EntityType::Other,
    }
}

fn truncate(s: &str, max_len: usize) -> &str {
    match s.char_indices().nth(max_len) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let result = parse_extraction_response(
            r#"{"entities":[{"name":"Ada","type":"person","role":"author"}],
                "relations":[{"source_name":"Ada","target_name":"Analytical Engine","relation_type":"created_by"}]}"#,
        )
        .unwrap();
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].entity_type(), EntityType::Person);
        assert_eq!(result.entities[0].confidence, Some(1.0));
        assert_eq!(result.relations[0].relation_type, "created_by");
    }

    #[test]
    fn strips_markdown_fences() {
        let result = parse_extraction_response(
            "```json\n{\"entities\":[{\"name\":\"Rust\",\"type\":\"technology\"}]}\n```",
        )
        .unwrap();
        assert_eq!(result.entities[0].entity_type(), EntityType::Technology);
    }

    #[test]
    fn empty_and_null_responses_yield_nothing() {
        for resp in ["", "null", "{}", "   "] {
            let result = parse_extraction_response(resp).unwrap();
            assert!(result.entities.is_empty());
            assert!(result.relations.is_empty());
        }
    }

    #[test]
    fn entities_only_object_is_accepted() {
        let result =
            parse_extraction_response(r#"{"entities":[{"name":"Berlin","type":"location"}]}"#)
                .unwrap();
        assert_eq!(result.entities.len(), 1);
        assert!(result.relations.is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_extraction_response("the text mentions Ada").is_err());
    }

    #[test]
    fn unknown_types_normalize() {
        assert_eq!(normalize_entity_type("company"), EntityType::Organization);
        assert_eq!(normalize_entity_type("Framework"), EntityType::Technology);
        assert_eq!(normalize_entity_type("city"), EntityType::Location);
        assert_eq!(normalize_entity_type("widget"), EntityType::Other);
        assert_eq!(normalize_entity_type("person"), EntityType::Person);
    }
}
