//! Direct Gemini client for skin analysis
//!
//! Sends one captured image plus the user's reported concerns to the
//! Gemini generateContent API and parses the structured diagnosis. The
//! response schema is enforced server-side and re-validated here: a
//! response missing any required field is a failure, never a partial
//! result. One attempt per scan; failures surface to the user.

mod types;
pub(crate) mod wire;

pub(crate) use types::{Detection, Diagnosis, OverlayRect, Severity};

use crate::capture::CapturedImage;
use crate::config::GeminiConfig;
use crate::error::AnalysisError;
use anyhow::Context as _;
use once_cell::sync::Lazy;
use std::time::Duration;
use tracing::{instrument, warn};
use wire::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};
use zeroize::Zeroize;

/// Client for the Gemini generateContent API
#[derive(Clone)]
pub(crate) struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

/// Analysis prompt; the user's selected concerns are appended
const ANALYSIS_PROMPT: &str = r#"Act as a professional dermatological AI assistant. Analyze the provided image of a person's face.

1. Identify the primary skin condition, assess its severity, and provide professional recommendations.
2. DETECT specific locations of skin issues (acne, dark circles, redness, spots) on the face. Return them as bounding boxes.

Be objective and clinical but supportive.
ALWAYS include a clear medical disclaimer that this is not a substitute for professional medical advice."#;

/// JSON schema the model's answer must conform to; mirrors `Diagnosis`
static RESPONSE_SCHEMA: Lazy<serde_json::Value> = Lazy::new(|| {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "condition": { "type": "STRING" },
            "confidence": { "type": "NUMBER" },
            "description": { "type": "STRING" },
            "severity": { "type": "STRING", "enum": ["Mild", "Moderate", "Severe"] },
            "recommendations": { "type": "ARRAY", "items": { "type": "STRING" } },
            "suggestedIngredients": { "type": "ARRAY", "items": { "type": "STRING" } },
            "disclaimer": { "type": "STRING" },
            "detections": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "label": { "type": "STRING" },
                        "box_2d": {
                            "type": "ARRAY",
                            "items": { "type": "NUMBER" },
                            "description": "Bounding box [ymin, xmin, ymax, xmax] on a 1000x1000 scale."
                        }
                    },
                    "required": ["label", "box_2d"]
                }
            }
        },
        "required": [
            "condition", "confidence", "description", "severity",
            "recommendations", "suggestedIngredients", "disclaimer", "detections"
        ]
    })
});

impl GeminiClient {
    /// Create a new Gemini client from configuration and an API key
    pub(crate) fn new(config: &GeminiConfig, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client for GeminiClient")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            client,
        })
    }

    /// Analyze a captured image against the user's reported concerns
    ///
    /// Single attempt, no retry: a scan that fails is reported to the
    /// user rather than silently repeated.
    #[instrument(skip(self, image, concerns), fields(concern_count = concerns.len()))]
    pub(crate) async fn analyze(
        &self,
        image: &CapturedImage,
        concerns: &[String],
    ) -> Result<Diagnosis, AnalysisError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::Text {
                        text: build_analysis_prompt(concerns),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: image.mime_type.clone(),
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: RESPONSE_SCHEMA.clone(),
            }),
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AnalysisError::ServerError { status, message });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            AnalysisError::InvalidResponse(format!("Failed to parse Gemini response: {e}"))
        })?;

        let text = wire::extract_text(&parsed).ok_or_else(|| {
            AnalysisError::InvalidResponse("No text content in Gemini response".into())
        })?;

        parse_diagnosis(&text)
    }

    /// Endpoint settings for opening a chat session against the same model
    pub(crate) fn endpoint(&self) -> (String, String, String) {
        (
            self.base_url.clone(),
            self.model.clone(),
            self.api_key.clone(),
        )
    }
}

impl Drop for GeminiClient {
    fn drop(&mut self) {
        // Clear API key from memory
        self.api_key.zeroize();
    }
}

/// Build the analysis prompt with the user's reported concerns
fn build_analysis_prompt(concerns: &[String]) -> String {
    format!(
        "{ANALYSIS_PROMPT}\n\nUser's reported concerns: {}.",
        concerns.join(", ")
    )
}

/// Parse the model's JSON answer into a Diagnosis
///
/// Detections whose boxes fall outside the 0-1000 scale or have inverted
/// extents are dropped here, at the boundary; the rest of the diagnosis
/// is kept.
fn parse_diagnosis(text: &str) -> Result<Diagnosis, AnalysisError> {
    let mut diagnosis: Diagnosis = serde_json::from_str(text).map_err(|e| {
        AnalysisError::InvalidResponse(format!("Diagnosis violates the response contract: {e}"))
    })?;

    diagnosis.detections.retain(|detection| {
        if detection.has_valid_box() {
            true
        } else {
            warn!(
                label = %detection.label,
                box_2d = ?detection.box_2d,
                "Dropping detection with malformed bounding box"
            );
            false
        }
    });

    Ok(diagnosis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_prompt_includes_concerns() {
        let prompt =
            build_analysis_prompt(&["acne".to_string(), "redness".to_string()]);
        assert!(prompt.contains("User's reported concerns: acne, redness."));
        assert!(prompt.contains("medical disclaimer"));
    }

    #[test]
    fn test_response_schema_lists_required_fields() {
        let required = RESPONSE_SCHEMA["required"]
            .as_array()
            .expect("required array");
        assert_eq!(required.len(), 8);
        assert!(required.iter().any(|v| v == "severity"));
        assert!(required.iter().any(|v| v == "detections"));
    }

    #[test]
    fn test_parse_diagnosis_drops_malformed_boxes() {
        let json = r#"{
            "condition": "Acne Vulgaris",
            "confidence": 0.9,
            "description": "Comedones on the chin.",
            "severity": "Moderate",
            "recommendations": [],
            "suggestedIngredients": [],
            "disclaimer": "Not medical advice.",
            "detections": [
                {"label": "Acne", "box_2d": [100, 200, 300, 500]},
                {"label": "Ghost", "box_2d": [900, 200, 100, 500]},
                {"label": "OffScale", "box_2d": [0, 0, 1500, 1500]}
            ]
        }"#;
        let diagnosis = parse_diagnosis(json).expect("parse");
        assert_eq!(diagnosis.detections.len(), 1);
        assert_eq!(diagnosis.detections[0].label, "Acne");
    }

    #[test]
    fn test_parse_diagnosis_rejects_missing_field() {
        let json = r#"{"condition": "Acne"}"#;
        let err = parse_diagnosis(json).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidResponse(_)));
    }
}
