//! Request and response types for the Gemini generateContent API
//!
//! Shared between the one-shot analysis call and the streaming chat
//! session; both speak the same wire format.

use serde::{Deserialize, Serialize};

/// Request body for generateContent / streamGenerateContent
#[derive(Debug, Serialize)]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// One conversational turn
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub(crate) fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part::Text { text: text.into() }],
        }
    }
}

/// A part of a turn: plain text or inline binary data
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub(crate) enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Output shaping: forces the model to answer in schema-conforming JSON
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: serde_json::Value,
}

/// Response body for generateContent; streaming sends one of these per
/// SSE event
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidatePart {
    pub text: Option<String>,
}

/// Concatenated text of the first candidate, if any
pub(crate) fn extract_text(response: &GenerateContentResponse) -> Option<String> {
    let candidate = response.candidates.as_ref()?.first()?;
    let parts = &candidate.content.as_ref()?.parts;

    let mut text = String::new();
    for part in parts {
        if let Some(fragment) = &part.text {
            text.push_str(fragment);
        }
    }

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_with_inline_data() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::Text {
                        text: "Analyze this image".to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: "aGVsbG8=".to_string(),
                        },
                    },
                ],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: serde_json::json!({"type": "OBJECT"}),
            }),
        };

        let json = serde_json::to_string(&request).expect("serialize");
        assert!(json.contains("\"inlineData\""));
        assert!(json.contains("\"mimeType\":\"image/jpeg\""));
        assert!(json.contains("\"responseMimeType\":\"application/json\""));
        assert!(json.contains("\"responseSchema\""));
        assert!(!json.contains("systemInstruction"));
    }

    #[test]
    fn test_request_serialization_with_system_instruction() {
        let request = GenerateContentRequest {
            contents: vec![Content::text("user", "hello")],
            system_instruction: Some(Content::text("system", "be brief")),
            generation_config: None,
        };

        let json = serde_json::to_string(&request).expect("serialize");
        assert!(json.contains("\"systemInstruction\""));
        assert!(!json.contains("generationConfig"));
    }

    #[test]
    fn test_extract_text_concatenates_parts() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Hello "}, {"text": "world"}]}}
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(extract_text(&response).as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": []}"#).expect("parse");
        assert!(extract_text(&response).is_none());

        let response: GenerateContentResponse = serde_json::from_str(r#"{}"#).expect("parse");
        assert!(extract_text(&response).is_none());
    }
}
